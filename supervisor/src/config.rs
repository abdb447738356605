//! Launch configuration
//!
//! A [`LaunchConfig`] describes one server: what to execute, where, and the
//! policies governing its lock and startup. It can be built in code with the
//! fluent `with_*` methods or read from a JSON file.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::identity::ProcessIdentity;
use crate::core::readiness::DEFAULT_READY_PATTERN;
use crate::error::{SupervisorError, SupervisorResult};

/// Lock file name used when none is configured
pub const DEFAULT_LOCK_FILE: &str = "lock.pid";

/// Default upper bound on the readiness wait
pub const DEFAULT_STARTUP_TIMEOUT_MS: u64 = 120_000;

/// What to do with the lock when the server closes its output before ready
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartupFailurePolicy {
    /// Leave the lock in place; a later check removes it once the process is gone
    #[default]
    KeepLock,
    /// Reap the process and delete the lock before reporting the failure
    ReleaseLock,
}

/// Everything needed to launch and supervise one server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchConfig {
    /// Executable to run (looked up on PATH when not a path)
    pub program: String,
    /// Ordered arguments, including memory limits
    pub args: Vec<String>,
    /// Directory the server runs in; the current directory when unset
    pub working_dir: Option<PathBuf>,
    /// Extra environment variables for the server
    pub env: BTreeMap<String, String>,
    /// Lock file location; relative paths resolve against `working_dir`
    pub lock_path: PathBuf,
    /// Regular expression marking a completed startup
    pub ready_pattern: String,
    /// Identity a live PID must have for its lock to count; derived from
    /// `program` when unset
    pub identity: Option<ProcessIdentity>,
    /// Readiness wait limit in milliseconds; `None` waits for EOF only
    pub startup_timeout_ms: Option<u64>,
    /// Milliseconds to wait after the stop command before escalating to signals
    pub stop_timeout_ms: Option<u64>,
    pub on_startup_failure: StartupFailurePolicy,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self::java_server("server.jar", "1024M", "1024M")
    }
}

impl LaunchConfig {
    /// Arbitrary program with default policies
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            env: BTreeMap::new(),
            lock_path: PathBuf::from(DEFAULT_LOCK_FILE),
            ready_pattern: DEFAULT_READY_PATTERN.to_string(),
            identity: None,
            startup_timeout_ms: Some(DEFAULT_STARTUP_TIMEOUT_MS),
            stop_timeout_ms: None,
            on_startup_failure: StartupFailurePolicy::default(),
        }
    }

    /// `java -Xms<xms> -Xmx<xmx> -jar <server_file> nogui`
    pub fn java_server(server_file: &str, xms: &str, xmx: &str) -> Self {
        Self::new("java").with_args([
            format!("-Xms{xms}"),
            format!("-Xmx{xmx}"),
            "-jar".to_string(),
            server_file.to_string(),
            "nogui".to_string(),
        ])
    }

    /// Read a configuration from a JSON file; missing fields take defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> SupervisorResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|e| {
            shared::SharedError::DeserializationError {
                message: format!("{}: {e}", path.display()),
            }
            .into()
        })
    }

    pub fn with_args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_lock_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.lock_path = path.into();
        self
    }

    pub fn with_ready_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.ready_pattern = pattern.into();
        self
    }

    pub fn with_identity(mut self, identity: ProcessIdentity) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn with_startup_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.startup_timeout_ms = timeout.map(|t| (t.as_millis() as u64).max(1));
        self
    }

    pub fn with_stop_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.stop_timeout_ms = timeout.map(|t| (t.as_millis() as u64).max(1));
        self
    }

    pub fn with_startup_failure_policy(mut self, policy: StartupFailurePolicy) -> Self {
        self.on_startup_failure = policy;
        self
    }

    /// Lock path with relative paths anchored at the working directory
    pub fn resolved_lock_path(&self) -> PathBuf {
        match &self.working_dir {
            Some(dir) if self.lock_path.is_relative() => dir.join(&self.lock_path),
            _ => self.lock_path.clone(),
        }
    }

    pub fn effective_identity(&self) -> ProcessIdentity {
        self.identity
            .clone()
            .unwrap_or_else(|| ProcessIdentity::for_program(&self.program))
    }

    pub fn startup_timeout(&self) -> Option<Duration> {
        self.startup_timeout_ms.map(Duration::from_millis)
    }

    pub fn stop_timeout(&self) -> Option<Duration> {
        self.stop_timeout_ms.map(Duration::from_millis)
    }

    /// Reject configurations that can never launch
    pub fn validate(&self) -> SupervisorResult<()> {
        if self.program.trim().is_empty() {
            return Err(SupervisorError::config("program must not be empty"));
        }
        if self.lock_path.as_os_str().is_empty() {
            return Err(SupervisorError::config("lock_path must not be empty"));
        }
        if self.startup_timeout_ms == Some(0) {
            return Err(SupervisorError::config("startup_timeout_ms must be positive"));
        }
        if self.stop_timeout_ms == Some(0) {
            return Err(SupervisorError::config("stop_timeout_ms must be positive"));
        }
        if let Some(dir) = &self.working_dir {
            if !dir.is_dir() {
                return Err(SupervisorError::config(format!(
                    "working_dir {} is not a directory",
                    dir.display()
                )));
            }
        }
        Ok(())
    }
}

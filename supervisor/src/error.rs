//! Supervisor error types

use shared::SharedError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("Server is already running (PID: {pid}, lock: {})", lock_path.display())]
    AlreadyRunning { pid: u32, lock_path: PathBuf },

    #[error("Server (PID: {pid}) closed its output before becoming ready; last line: {last_line:?}")]
    StartupFailed { pid: u32, last_line: String },

    #[error("Server (PID: {pid}) did not become ready within {timeout:?}; last line: {last_line:?}")]
    StartupTimedOut {
        pid: u32,
        last_line: String,
        timeout: Duration,
    },

    #[error("Startup of server (PID: {pid}) was cancelled")]
    StartupCancelled { pid: u32 },

    #[error("Failed to spawn server process: {program}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Lock file already exists: {}", path.display())]
    LockHeld { path: PathBuf },

    #[error("Lock file operation failed: {operation} on {}", path.display())]
    LockError {
        operation: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to send command {command:?} to server")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {field}")]
    ConfigurationError { field: String },

    #[error("Shared component error")]
    SharedError(#[from] SharedError),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl SupervisorError {
    /// Create a configuration error
    pub fn config(field: impl Into<String>) -> Self {
        Self::ConfigurationError { field: field.into() }
    }

    /// Create a lock file error for the given operation
    pub fn lock(operation: impl Into<String>, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::LockError {
            operation: operation.into(),
            path: path.into(),
            source,
        }
    }

    /// PID of the server process this error refers to, when there is one
    pub fn pid(&self) -> Option<u32> {
        match self {
            Self::AlreadyRunning { pid, .. }
            | Self::StartupFailed { pid, .. }
            | Self::StartupTimedOut { pid, .. }
            | Self::StartupCancelled { pid } => Some(*pid),
            _ => None,
        }
    }
}

pub type SupervisorResult<T> = Result<T, SupervisorError>;

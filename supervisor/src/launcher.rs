//! Server launcher
//!
//! Spawns the server, publishes its PID in the lock registry and waits for
//! the readiness line on its standard output. Ordering matters: the lock is
//! created right after spawn and before the first output line is read, so a
//! concurrent launcher that checks from that point on sees the server.

use std::io;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;

use shared::{supervisor_debug, supervisor_info, supervisor_warn, Component};

use crate::config::{LaunchConfig, StartupFailurePolicy};
use crate::core::lock_registry::LockRegistry;
use crate::core::readiness::{ReadinessMatcher, StartupScan};
use crate::core::state::{StateEvent, SupervisorState};
use crate::error::{SupervisorError, SupervisorResult};
use crate::services::output::{spawn_stderr_drain, ServerOutput};
use crate::services::{FileLockStore, SysinfoInspector};
use crate::supervisor::Supervisor;
use crate::traits::{LockStore, ProcessInspector};

/// Longest output line scanned for readiness; longer lines are skipped
const MAX_LINE_BYTES: u64 = 64 * 1024;

/// How the readiness wait ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StartupOutcome {
    Ready,
    Eof,
    TimedOut(Duration),
    Cancelled,
}

/// Launches servers guarded by one lock registry
pub struct Launcher<S = FileLockStore, I = SysinfoInspector> {
    registry: Arc<LockRegistry<S, I>>,
    cancel: Option<CancellationToken>,
}

impl Launcher {
    /// Launcher using the lock file and identity described by `config`
    pub fn for_config(config: &LaunchConfig) -> Self {
        Self::with_registry(LockRegistry::new(
            FileLockStore::new(config.resolved_lock_path()),
            SysinfoInspector::new(),
            config.effective_identity(),
        ))
    }
}

impl<S: LockStore, I: ProcessInspector> Launcher<S, I> {
    pub fn with_registry(registry: LockRegistry<S, I>) -> Self {
        Self {
            registry: Arc::new(registry),
            cancel: None,
        }
    }

    /// Abort readiness waits when `token` is cancelled (fluent API)
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn registry(&self) -> &LockRegistry<S, I> {
        &self.registry
    }

    /// Launch a server and wait until it reports ready
    ///
    /// # Errors
    /// - `AlreadyRunning` when a valid lock exists; nothing is spawned
    /// - `SpawnFailed` when the OS refuses to start the program
    /// - `StartupFailed` when output ends before the ready line
    /// - `StartupTimedOut` / `StartupCancelled` when the wait is cut short;
    ///   the server is killed and the lock released
    pub async fn launch(&self, config: LaunchConfig) -> SupervisorResult<Supervisor<S, I>> {
        config.validate()?;
        let matcher = ReadinessMatcher::new(&config.ready_pattern)?;

        if let Some(pid) = self.registry.check().await? {
            supervisor_warn!(Component::Launcher, "⚠️ Server already running (PID: {})", pid);
            return Err(SupervisorError::AlreadyRunning {
                pid,
                lock_path: self.registry.path(),
            });
        }

        let mut state = SupervisorState::Off;
        let mut child = spawn_server(&config)?;
        let Some(pid) = child.id() else {
            return Err(SupervisorError::SpawnFailed {
                program: config.program.clone(),
                source: io::Error::new(io::ErrorKind::Other, "process exited before its PID was known"),
            });
        };
        state = state.apply(StateEvent::Spawned);
        supervisor_info!(
            Component::Launcher,
            "🚀 Spawned {} (PID: {}), waiting for readiness",
            config.program,
            pid
        );

        if let Err(err) = self.registry.create(pid).await {
            kill_and_reap(&mut child, pid).await;
            return Err(match err {
                SupervisorError::LockHeld { path } => {
                    let holder = self.registry.recorded_pid().await.ok().flatten().unwrap_or_default();
                    supervisor_warn!(
                        Component::Launcher,
                        "⚠️ Lost the lock race to PID {}; killed PID {}",
                        holder,
                        pid
                    );
                    SupervisorError::AlreadyRunning { pid: holder, lock_path: path }
                }
                other => other,
            });
        }

        let stderr_drain = child.stderr.take().map(|stderr| spawn_stderr_drain(stderr, pid));
        let Some(stdout) = child.stdout.take() else {
            self.abort_startup(&mut child, pid).await;
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "server stdout was not captured").into());
        };

        let mut output = BufReader::new(stdout);
        let mut scan = StartupScan::new(&matcher);
        let outcome = self.await_ready(&mut output, &mut scan, pid, config.startup_timeout()).await;
        let lines_seen = scan.lines_seen();
        let last_line = scan.into_last_line();

        match outcome {
            Ok(StartupOutcome::Ready) => {
                state = state.apply(StateEvent::Ready);
                supervisor_info!(
                    Component::Launcher,
                    "✅ Server ready (PID: {}) after {} output lines",
                    pid,
                    lines_seen
                );
                Ok(Supervisor::new(
                    child,
                    pid,
                    output,
                    state,
                    Arc::clone(&self.registry),
                    config.stop_timeout(),
                    stderr_drain,
                ))
            }
            Ok(StartupOutcome::Eof) => {
                match config.on_startup_failure {
                    StartupFailurePolicy::KeepLock => {
                        supervisor_warn!(
                            Component::Launcher,
                            "❌ Server (PID: {}) closed its output before ready; lock left in place",
                            pid
                        );
                    }
                    StartupFailurePolicy::ReleaseLock => {
                        supervisor_warn!(
                            Component::Launcher,
                            "❌ Server (PID: {}) closed its output before ready; releasing lock",
                            pid
                        );
                        self.abort_startup(&mut child, pid).await;
                    }
                }
                Err(SupervisorError::StartupFailed { pid, last_line })
            }
            Ok(StartupOutcome::TimedOut(timeout)) => {
                supervisor_warn!(
                    Component::Launcher,
                    "⏱️ Server (PID: {}) not ready after {:?}; killing it",
                    pid,
                    timeout
                );
                self.abort_startup(&mut child, pid).await;
                Err(SupervisorError::StartupTimedOut { pid, last_line, timeout })
            }
            Ok(StartupOutcome::Cancelled) => {
                supervisor_info!(Component::Launcher, "Startup of PID {} cancelled", pid);
                self.abort_startup(&mut child, pid).await;
                Err(SupervisorError::StartupCancelled { pid })
            }
            Err(e) => {
                self.abort_startup(&mut child, pid).await;
                Err(e.into())
            }
        }
    }

    async fn await_ready(
        &self,
        output: &mut ServerOutput,
        scan: &mut StartupScan<'_>,
        pid: u32,
        timeout: Option<Duration>,
    ) -> io::Result<StartupOutcome> {
        let deadline = async {
            match timeout {
                Some(timeout) => {
                    tokio::time::sleep(timeout).await;
                    timeout
                }
                None => std::future::pending().await,
            }
        };
        let cancelled = async {
            match &self.cancel {
                Some(token) => token.cancelled().await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            ready = scan_output(output, scan, pid) => {
                ready.map(|ready| if ready { StartupOutcome::Ready } else { StartupOutcome::Eof })
            }
            timeout = deadline => Ok(StartupOutcome::TimedOut(timeout)),
            _ = cancelled => Ok(StartupOutcome::Cancelled),
        }
    }

    /// Kill a server that never became ready and release its lock
    ///
    /// A lock that cannot be deleted is only logged; the next check treats
    /// it as stale once the process is gone.
    async fn abort_startup(&self, child: &mut Child, pid: u32) {
        kill_and_reap(child, pid).await;
        if let Err(e) = self.registry.delete().await {
            supervisor_warn!(Component::Launcher, "Could not release lock of PID {}: {}", pid, e);
        }
    }
}

/// Read output lines until the ready line (true) or end of stream (false)
///
/// Lines longer than `MAX_LINE_BYTES` are skipped as non-matching text.
async fn scan_output<R>(output: &mut R, scan: &mut StartupScan<'_>, pid: u32) -> io::Result<bool>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let mut oversized = false;
    loop {
        buf.clear();
        let read = (&mut *output).take(MAX_LINE_BYTES).read_until(b'\n', &mut buf).await?;
        if read == 0 {
            return Ok(false);
        }
        let complete = buf.ends_with(b"\n");
        if oversized || (!complete && read as u64 == MAX_LINE_BYTES) {
            if !oversized {
                supervisor_debug!(Component::Launcher, "[{} stdout] skipping line over {} bytes", pid, MAX_LINE_BYTES);
            }
            oversized = !complete;
            continue;
        }
        supervisor_debug!(
            Component::Launcher,
            "[{} stdout] {}",
            pid,
            String::from_utf8_lossy(&buf).trim_end()
        );
        if scan.observe(&buf) {
            return Ok(true);
        }
    }
}

fn spawn_server(config: &LaunchConfig) -> SupervisorResult<Child> {
    let mut cmd = Command::new(&config.program);
    cmd.args(&config.args)
        .envs(&config.env)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    if let Some(dir) = &config.working_dir {
        cmd.current_dir(dir);
    }

    cmd.spawn().map_err(|source| SupervisorError::SpawnFailed {
        program: config.program.clone(),
        source,
    })
}

async fn kill_and_reap(child: &mut Child, pid: u32) {
    if let Err(e) = child.kill().await {
        supervisor_warn!(Component::Launcher, "Failed to kill PID {}: {}", pid, e);
    }
}

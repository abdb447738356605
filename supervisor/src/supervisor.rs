//! Handle to one running, supervised server
//!
//! A [`Supervisor`] is only obtained from a successful launch. It owns the
//! child process, its standard input and the lock entry naming it, and keeps
//! its status honest by asking the OS before answering.

use std::io;
use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin};
use tokio::task::JoinHandle;

use shared::{supervisor_debug, supervisor_info, supervisor_warn, Component};

use crate::core::lock_registry::LockRegistry;
use crate::core::state::{StateEvent, SupervisorState};
use crate::error::{SupervisorError, SupervisorResult};
use crate::services::output::ServerOutput;
use crate::services::{FileLockStore, SysinfoInspector};
use crate::traits::{LockStore, ProcessInspector};

/// Command asking the server to shut down gracefully
pub const STOP_COMMAND: &str = "stop";

/// Wait after SIGTERM before killing outright
const KILL_GRACE: Duration = Duration::from_secs(5);

pub struct Supervisor<S = FileLockStore, I = SysinfoInspector> {
    child: Child,
    pid: u32,
    stdin: Option<ChildStdin>,
    output: Option<ServerOutput>,
    state: SupervisorState,
    registry: Arc<LockRegistry<S, I>>,
    stop_timeout: Option<Duration>,
    stderr_drain: Option<JoinHandle<()>>,
    started_at: DateTime<Utc>,
}

impl<S: LockStore, I: ProcessInspector> Supervisor<S, I> {
    pub(crate) fn new(
        mut child: Child,
        pid: u32,
        output: ServerOutput,
        state: SupervisorState,
        registry: Arc<LockRegistry<S, I>>,
        stop_timeout: Option<Duration>,
        stderr_drain: Option<JoinHandle<()>>,
    ) -> Self {
        let stdin = child.stdin.take();
        Self {
            child,
            pid,
            stdin,
            output: Some(output),
            state,
            registry,
            stop_timeout,
            stderr_drain,
            started_at: Utc::now(),
        }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn lock_path(&self) -> std::path::PathBuf {
        self.registry.path()
    }

    /// Current status; an exit observed by the OS always wins
    pub fn status(&mut self) -> SupervisorState {
        match self.child.try_wait() {
            Ok(Some(exit)) => {
                if self.state != SupervisorState::Off {
                    supervisor_info!(
                        Component::Supervisor,
                        "Server (PID: {}) exited while {}: {}",
                        self.pid,
                        self.state,
                        exit
                    );
                }
                self.transition(StateEvent::Exited);
            }
            Ok(None) => {}
            Err(e) => {
                supervisor_warn!(Component::Supervisor, "Could not poll PID {}: {}", self.pid, e);
            }
        }
        self.state
    }

    /// Take the server's standard output, positioned after the ready line
    ///
    /// The supervisor never reads it. A caller that takes it should keep
    /// consuming it, or a chatty server may block on a full pipe.
    pub fn take_output(&mut self) -> Option<ServerOutput> {
        self.output.take()
    }

    /// Write `command` and a newline to the server's standard input
    ///
    /// Fire-and-forget: nothing is validated and no reply is awaited.
    pub async fn send_command(&mut self, command: &str) -> SupervisorResult<()> {
        let failed = |source: io::Error| SupervisorError::CommandFailed {
            command: command.to_string(),
            source,
        };
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| failed(io::Error::new(io::ErrorKind::BrokenPipe, "server stdin is closed")))?;

        stdin.write_all(format!("{command}\n").as_bytes()).await.map_err(failed)?;
        stdin.flush().await.map_err(failed)?;

        supervisor_debug!(Component::Supervisor, "➡️ Sent {:?} to PID {}", command, self.pid);
        Ok(())
    }

    /// Gracefully stop the server and release its lock
    ///
    /// Sends the stop command and waits for the process to exit. With a stop
    /// timeout configured, a server that does not exit in time is sent
    /// SIGTERM and finally killed. Callers should check `status()` first;
    /// stopping an already stopped server only repeats the cleanup.
    pub async fn stop(&mut self) -> SupervisorResult<ExitStatus> {
        self.transition(StateEvent::StopRequested);
        supervisor_info!(Component::Supervisor, "🛑 Stopping server (PID: {})", self.pid);

        if let Err(e) = self.send_command(STOP_COMMAND).await {
            supervisor_warn!(Component::Supervisor, "Stop command not delivered: {}", e);
        }
        let exit = self.wait_for_exit().await?;
        self.stdin = None;
        if let Some(drain) = self.stderr_drain.take() {
            // Let the last stderr lines reach the log
            let _ = tokio::time::timeout(Duration::from_secs(1), drain).await;
        }

        self.release_lock().await?;
        self.transition(StateEvent::Exited);
        supervisor_info!(Component::Supervisor, "✅ Server (PID: {}) stopped: {}", self.pid, exit);
        Ok(exit)
    }

    /// Wait for the server to exit on its own
    pub async fn wait(&mut self) -> SupervisorResult<ExitStatus> {
        let exit = self.child.wait().await?;
        self.transition(StateEvent::Exited);
        Ok(exit)
    }

    /// Kill the server if it is still alive, reap it and release its lock
    pub async fn cleanup(&mut self) -> SupervisorResult<()> {
        if self.child.try_wait()?.is_none() {
            supervisor_warn!(Component::Supervisor, "💀 Killing server (PID: {})", self.pid);
            self.child.start_kill()?;
        }
        self.child.wait().await?;
        self.stdin = None;
        self.release_lock().await?;
        self.transition(StateEvent::Exited);
        Ok(())
    }

    async fn wait_for_exit(&mut self) -> SupervisorResult<ExitStatus> {
        let Some(grace) = self.stop_timeout else {
            return Ok(self.child.wait().await?);
        };
        if let Ok(exit) = tokio::time::timeout(grace, self.child.wait()).await {
            return Ok(exit?);
        }

        supervisor_warn!(
            Component::Supervisor,
            "⏱️ Server (PID: {}) still running {:?} after stop; terminating",
            self.pid,
            grace
        );
        self.terminate();
        if let Ok(exit) = tokio::time::timeout(KILL_GRACE, self.child.wait()).await {
            return Ok(exit?);
        }

        supervisor_warn!(Component::Supervisor, "💀 Killing server (PID: {})", self.pid);
        self.child.start_kill()?;
        Ok(self.child.wait().await?)
    }

    #[cfg(unix)]
    fn terminate(&mut self) {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        if let Err(e) = kill(Pid::from_raw(self.pid as i32), Signal::SIGTERM) {
            supervisor_warn!(Component::Supervisor, "SIGTERM to PID {} failed: {}", self.pid, e);
        }
    }

    #[cfg(not(unix))]
    fn terminate(&mut self) {
        if let Err(e) = self.child.start_kill() {
            supervisor_warn!(Component::Supervisor, "Terminating PID {} failed: {}", self.pid, e);
        }
    }

    /// Delete the lock unless it has since been taken over by another server
    async fn release_lock(&self) -> SupervisorResult<()> {
        match self.registry.recorded_pid().await? {
            Some(holder) if holder != self.pid => {
                supervisor_warn!(
                    Component::Supervisor,
                    "Lock now names PID {}, leaving it in place",
                    holder
                );
                Ok(())
            }
            _ => self.registry.delete().await,
        }
    }

    fn transition(&mut self, event: StateEvent) {
        let next = self.state.apply(event);
        if next != self.state {
            supervisor_debug!(
                Component::Supervisor,
                "PID {}: {} -> {} ({:?})",
                self.pid,
                self.state,
                next,
                event
            );
        }
        self.state = next;
    }
}

//! Single-instance server supervisor
//!
//! This library launches one long-running server process, waits until it
//! prints its readiness line, refuses to start a second instance while the
//! first is alive, forwards text commands to it and stops it gracefully.
//!
//! ```no_run
//! use supervisor::{launch, LaunchConfig, SupervisorState};
//!
//! # async fn run() -> supervisor::SupervisorResult<()> {
//! let config = LaunchConfig::java_server("server.jar", "1024M", "2048M").with_working_dir("/srv/minecraft");
//! let mut server = launch(config).await?;
//! assert_eq!(server.status(), SupervisorState::Running);
//! server.send_command("say hello").await?;
//! server.stop().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod launcher;
pub mod services;
pub mod supervisor;
pub mod traits;

// Re-export commonly used types
pub use crate::config::{LaunchConfig, StartupFailurePolicy};
pub use crate::core::{IdentityPredicate, LockRegistry, ProcessIdentity, SupervisorState};
pub use error::{SupervisorError, SupervisorResult};
pub use launcher::Launcher;
pub use services::{FileLockStore, ServerOutput, SysinfoInspector};
pub use supervisor::{Supervisor, STOP_COMMAND};
pub use traits::{LockStore, ProcessInspector, ProcessSnapshot};

/// Launch a server guarded by the lock file named in its configuration
pub async fn launch(config: LaunchConfig) -> SupervisorResult<Supervisor> {
    Launcher::for_config(&config).launch(config).await
}

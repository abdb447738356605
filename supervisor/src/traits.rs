//! Trait definitions with mockall annotations for testing
//!
//! The lock registry talks to the outside world through two seams: the
//! storage holding the PID marker and the OS process table used to validate
//! it. Both are injected so registry behaviour can be exercised with mocks.

use std::path::PathBuf;

use crate::error::SupervisorResult;

/// Metadata for one OS process, as seen at the moment it was inspected
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProcessSnapshot {
    pub pid: u32,
    /// Short process name as reported by the OS
    pub name: String,
    /// Full command line, program first
    pub cmd: Vec<String>,
    /// Resolved executable path, when the OS exposes it
    pub exe: Option<PathBuf>,
    /// Exited but not yet reaped by its parent
    pub zombie: bool,
}

impl ProcessSnapshot {
    /// Command line joined with spaces
    pub fn command_line(&self) -> String {
        self.cmd.join(" ")
    }
}

/// Persistent storage for the PID lock marker
///
/// Implementations must make `create_exclusive` atomic: the marker either
/// appears with its full contents or not at all, and never replaces an
/// existing marker.
#[mockall::automock]
#[async_trait::async_trait]
pub trait LockStore: Send + Sync {
    /// Location of the marker, used in diagnostics
    fn path(&self) -> PathBuf;

    /// Read the marker contents
    ///
    /// # Returns
    /// `None` when no marker exists
    async fn read(&self) -> SupervisorResult<Option<String>>;

    /// Create the marker with the given contents if it does not exist yet
    ///
    /// # Returns
    /// `false` when a marker already exists (nothing is written)
    async fn create_exclusive(&self, contents: &str) -> SupervisorResult<bool>;

    /// Remove the marker
    ///
    /// # Returns
    /// `false` when there was no marker to remove
    async fn remove(&self) -> SupervisorResult<bool>;
}

/// Read-only view of the OS process table
#[mockall::automock]
pub trait ProcessInspector: Send + Sync {
    /// Take a snapshot of the process with the given PID
    ///
    /// # Returns
    /// `None` when no such process exists
    fn snapshot(&self, pid: u32) -> Option<ProcessSnapshot>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_trait_instantiation() {
        let _mock_store = MockLockStore::new();
        let _mock_inspector = MockProcessInspector::new();
    }

    #[test]
    fn test_command_line_joins_arguments() {
        let snapshot = ProcessSnapshot {
            pid: 7,
            name: "java".to_string(),
            cmd: vec!["java".into(), "-jar".into(), "server.jar".into()],
            exe: None,
            zombie: false,
        };
        assert_eq!(snapshot.command_line(), "java -jar server.jar");
    }
}

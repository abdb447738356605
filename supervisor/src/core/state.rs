//! Supervisor status model
//!
//! ```text
//! OFF --spawned--> STARTING --ready--> RUNNING --stop--> STOPPING --exited--> OFF
//!  ^                                                                          |
//!  +------------------------- exited (any state) -----------------------------+
//! ```
//!
//! STARTING only exists while a launch is in progress; callers of
//! `Supervisor::status` never observe it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a supervised server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SupervisorState {
    Off,
    Starting,
    Running,
    Stopping,
    /// Not yet attached to a process
    #[default]
    Unknown,
}

/// Something that happened to the supervised process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateEvent {
    /// The OS process was created
    Spawned,
    /// The readiness line was seen
    Ready,
    /// A graceful stop was requested
    StopRequested,
    /// The OS reported the process gone
    Exited,
}

impl SupervisorState {
    /// Next state after `event`
    ///
    /// Exit always wins. Events that make no sense in the current state
    /// leave it unchanged.
    pub fn apply(self, event: StateEvent) -> SupervisorState {
        match (self, event) {
            (_, StateEvent::Exited) => SupervisorState::Off,
            (_, StateEvent::Spawned) => SupervisorState::Starting,
            (SupervisorState::Starting, StateEvent::Ready) => SupervisorState::Running,
            (_, StateEvent::StopRequested) => SupervisorState::Stopping,
            (state, _) => state,
        }
    }

    /// Whether an OS process is expected to exist in this state
    pub fn is_active(self) -> bool {
        matches!(
            self,
            SupervisorState::Starting | SupervisorState::Running | SupervisorState::Stopping
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SupervisorState::Off => "OFF",
            SupervisorState::Starting => "STARTING",
            SupervisorState::Running => "RUNNING",
            SupervisorState::Stopping => "STOPPING",
            SupervisorState::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use StateEvent::*;
    use SupervisorState::*;

    #[test]
    fn test_default_is_unknown() {
        assert_eq!(SupervisorState::default(), Unknown);
    }

    #[test]
    fn test_happy_path() {
        let state = Off.apply(Spawned);
        assert_eq!(state, Starting);
        let state = state.apply(Ready);
        assert_eq!(state, Running);
        let state = state.apply(StopRequested);
        assert_eq!(state, Stopping);
        assert_eq!(state.apply(Exited), Off);
    }

    #[test]
    fn test_exit_short_circuits_every_state() {
        for state in [Off, Starting, Running, Stopping, Unknown] {
            assert_eq!(state.apply(Exited), Off, "exit from {state}");
        }
    }

    #[test]
    fn test_ready_only_counts_while_starting() {
        assert_eq!(Off.apply(Ready), Off);
        assert_eq!(Stopping.apply(Ready), Stopping);
        assert_eq!(Running.apply(Ready), Running);
    }

    #[test]
    fn test_is_active() {
        assert!(Running.is_active());
        assert!(Stopping.is_active());
        assert!(!Off.is_active());
        assert!(!Unknown.is_active());
    }

    #[test]
    fn test_display_and_serde() {
        assert_eq!(Running.to_string(), "RUNNING");
        assert_eq!(serde_json::to_string(&Stopping).unwrap(), "\"STOPPING\"");
    }
}

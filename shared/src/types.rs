//! Component identifiers used to tag log events

use serde::{Deserialize, Serialize};
use std::fmt;

/// Part of the system emitting a log event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Component {
    /// Lock file validation and maintenance
    LockRegistry,
    /// Spawning and readiness detection
    Launcher,
    /// A running, supervised server
    Supervisor,
    /// The `srvctl` command line front end
    Cli,
}

impl Component {
    pub fn as_str(&self) -> &'static str {
        match self {
            Component::LockRegistry => "lock-registry",
            Component::Launcher => "launcher",
            Component::Supervisor => "supervisor",
            Component::Cli => "cli",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

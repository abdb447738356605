//! Process identity predicates
//!
//! A lock is only honoured when the PID it names belongs to the kind of
//! process we supervise. What "our kind" means is decided by an
//! [`IdentityPredicate`] over a [`ProcessSnapshot`].

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::traits::ProcessSnapshot;

/// Linux truncates process names to this many bytes
const MAX_COMM_LEN: usize = 15;

/// Decides whether a live process is the supervised server
pub trait IdentityPredicate: Send + Sync {
    fn matches(&self, snapshot: &ProcessSnapshot) -> bool;
}

impl<F> IdentityPredicate for F
where
    F: Fn(&ProcessSnapshot) -> bool + Send + Sync,
{
    fn matches(&self, snapshot: &ProcessSnapshot) -> bool {
        self(snapshot)
    }
}

/// Declarative identity, usable from configuration files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum ProcessIdentity {
    /// Process name or executable file name equals the given name
    ExecutableName(String),
    /// Command line contains the given fragment
    CommandContains(String),
    /// Any live process is accepted
    Any,
}

impl ProcessIdentity {
    /// Identity derived from the program a launch will execute
    pub fn for_program(program: &str) -> Self {
        let name = Path::new(program)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| program.to_string());
        ProcessIdentity::ExecutableName(name)
    }
}

fn name_matches(candidate: &str, expected: &str) -> bool {
    if candidate == expected {
        return true;
    }
    if let Some(stem) = candidate.strip_suffix(".exe") {
        if stem == expected || expected.strip_suffix(".exe") == Some(stem) {
            return true;
        }
    }
    candidate.len() == MAX_COMM_LEN && expected.starts_with(candidate)
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name().map(|name| name.to_string_lossy().into_owned())
}

impl IdentityPredicate for ProcessIdentity {
    fn matches(&self, snapshot: &ProcessSnapshot) -> bool {
        match self {
            ProcessIdentity::ExecutableName(expected) => {
                name_matches(&snapshot.name, expected)
                    || snapshot
                        .exe
                        .as_deref()
                        .and_then(file_name)
                        .is_some_and(|exe| name_matches(&exe, expected))
                    || snapshot
                        .cmd
                        .first()
                        .and_then(|arg0| file_name(Path::new(arg0)))
                        .is_some_and(|arg0| name_matches(&arg0, expected))
            }
            ProcessIdentity::CommandContains(fragment) => snapshot.command_line().contains(fragment.as_str()),
            ProcessIdentity::Any => true,
        }
    }
}

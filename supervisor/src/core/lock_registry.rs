//! PID lock registry
//!
//! Enforces that at most one supervised server runs per lock. The lock is a
//! single marker holding the server's PID; a marker is only honoured while
//! that PID belongs to a live process matching the expected identity.
//! Anything else is a stale lock and is removed on sight.

use std::path::PathBuf;

use shared::{supervisor_debug, supervisor_info, Component};

use crate::core::identity::IdentityPredicate;
use crate::error::{SupervisorError, SupervisorResult};
use crate::traits::{LockStore, ProcessInspector};

/// Why a lock marker was judged stale
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaleReason {
    Unparseable(String),
    NoSuchProcess(u32),
    Zombie(u32),
    IdentityMismatch { pid: u32, name: String },
}

impl std::fmt::Display for StaleReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StaleReason::Unparseable(contents) => write!(f, "contents {contents:?} are not a PID"),
            StaleReason::NoSuchProcess(pid) => write!(f, "no process with PID {pid}"),
            StaleReason::Zombie(pid) => write!(f, "process {pid} has already exited"),
            StaleReason::IdentityMismatch { pid, name } => {
                write!(f, "process {pid} ({name}) is not the supervised server")
            }
        }
    }
}

/// Parse the PID from lock contents: first line, surrounding whitespace ignored
pub fn parse_pid(contents: &str) -> Option<u32> {
    let first_line = contents.lines().next()?.trim();
    match first_line.parse::<u32>() {
        Ok(0) | Err(_) => None,
        Ok(pid) => Some(pid),
    }
}

/// Lock registry over an injected store and process inspector
pub struct LockRegistry<S, I> {
    store: S,
    inspector: I,
    identity: Box<dyn IdentityPredicate>,
}

impl<S: LockStore, I: ProcessInspector> LockRegistry<S, I> {
    pub fn new(store: S, inspector: I, identity: impl IdentityPredicate + 'static) -> Self {
        Self {
            store,
            inspector,
            identity: Box::new(identity),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.store.path()
    }

    /// PID of the currently running server, if the lock is valid
    ///
    /// A stale lock (unparseable, dead PID, zombie, or foreign process) is
    /// deleted as part of the check and reported as no lock.
    pub async fn check(&self) -> SupervisorResult<Option<u32>> {
        let Some(contents) = self.store.read().await? else {
            return Ok(None);
        };

        let stale = match parse_pid(&contents) {
            None => StaleReason::Unparseable(contents.trim().to_string()),
            Some(pid) => match self.inspector.snapshot(pid) {
                None => StaleReason::NoSuchProcess(pid),
                Some(snapshot) if snapshot.zombie => StaleReason::Zombie(pid),
                Some(snapshot) if !self.identity.matches(&snapshot) => StaleReason::IdentityMismatch {
                    pid,
                    name: snapshot.name,
                },
                Some(_) => {
                    supervisor_debug!(Component::LockRegistry, "🔒 Lock held by live server (PID: {})", pid);
                    return Ok(Some(pid));
                }
            },
        };

        supervisor_info!(
            Component::LockRegistry,
            "🧹 Removing stale lock {}: {}",
            self.store.path().display(),
            stale
        );
        self.delete().await?;
        Ok(None)
    }

    /// PID recorded in the lock, without validating it
    pub async fn recorded_pid(&self) -> SupervisorResult<Option<u32>> {
        Ok(self.store.read().await?.as_deref().and_then(parse_pid))
    }

    /// Record `pid` as the running server
    ///
    /// Fails with `LockHeld` if a lock already exists; an existing lock is
    /// never overwritten.
    pub async fn create(&self, pid: u32) -> SupervisorResult<()> {
        if !self.store.create_exclusive(&pid.to_string()).await? {
            return Err(SupervisorError::LockHeld { path: self.store.path() });
        }
        supervisor_debug!(
            Component::LockRegistry,
            "🔒 Created lock {} for PID {}",
            self.store.path().display(),
            pid
        );
        Ok(())
    }

    /// Remove the lock; an already missing lock is not an error
    pub async fn delete(&self) -> SupervisorResult<()> {
        if self.store.remove().await? {
            supervisor_debug!(Component::LockRegistry, "🔓 Deleted lock {}", self.store.path().display());
        } else {
            supervisor_info!(
                Component::LockRegistry,
                "Lock {} was already absent",
                self.store.path().display()
            );
        }
        Ok(())
    }
}

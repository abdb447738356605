//! Core supervision logic
//!
//! Pure state and policy: the status model, readiness detection, identity
//! predicates and the lock registry built on the injected seams.

pub mod identity;
pub mod lock_registry;
pub mod readiness;
pub mod state;

pub use identity::{IdentityPredicate, ProcessIdentity};
pub use lock_registry::{parse_pid, LockRegistry, StaleReason};
pub use readiness::{ReadinessMatcher, StartupScan, DEFAULT_READY_PATTERN};
pub use state::{StateEvent, SupervisorState};

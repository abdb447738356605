//! Shared types for the server supervisor
//!
//! Contains the pieces used by both the supervision library and the
//! `srvctl` binary: component identifiers for structured logging, the
//! logging setup itself, and the errors those helpers can raise.

pub mod errors;
pub mod logging;
pub mod types;

pub use errors::*;
pub use types::*;

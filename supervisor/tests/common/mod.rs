//! Common test utilities and infrastructure
//!
//! Fake servers are small `sh` scripts run in a temporary directory, so
//! every test gets its own working directory and lock file.

#![allow(dead_code)]

pub mod fixtures;
pub mod helpers;

// Re-export commonly used items for convenience
pub use fixtures::TestFixtures;
pub use helpers::TestHelpers;

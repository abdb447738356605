//! Service implementations
//!
//! Real implementations of the service traits. These are the production
//! implementations that touch the filesystem, the process table and pipes.

pub mod lock_file;
pub mod output;
pub mod process_inspector;

pub use lock_file::FileLockStore;
pub use output::ServerOutput;
pub use process_inspector::SysinfoInspector;

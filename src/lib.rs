//! Directory backup and restore engine.
//!
//! Snapshots a directory tree into a single zip archive, keeps it in a local
//! backup directory or an S3-compatible bucket, and materializes it back into
//! a directory tree.

pub mod backup;
pub mod config;
pub mod errors;
pub mod remote;
pub mod restore;
pub mod store;
pub mod utils;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use backup::archive::Archive;
pub use errors::{BackupError, ErrorKind, Result};
pub use remote::{ObjectStore, RemoteObjectRef, RemoteTransferClient};
pub use restore::extract::RestoredTree;

//! Snapshot error types.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for snapshot operations.
pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Errors that can occur while discovering snapshots.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// A directory could not be listed.
    #[error("Failed to list {}: {source}", path.display())]
    ListFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SnapshotError {
    /// Create a listing error for `path`.
    pub fn list_failed(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ListFailed {
            path: path.into(),
            source,
        }
    }
}

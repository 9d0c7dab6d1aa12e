//! Error types for the core crate.

use std::path::PathBuf;
use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Configuration error.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Snapshot discovery error.
    #[error("snapshot error: {0}")]
    Snapshot(#[from] snapback_snapshot::SnapshotError),

    /// Restore error.
    #[error("restore failed: {0}")]
    Restore(#[from] RestoreError),

    /// Task runner error.
    #[error("task error: {0}")]
    Runner(#[from] RunnerError),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid JSON syntax.
    #[error("invalid config at {path}: {message}")]
    InvalidJson { path: String, message: String },

    /// Config validation failed.
    #[error("config validation failed: {message}")]
    Validation { message: String },

    /// No such setting.
    #[error("unknown setting: {0}")]
    UnknownKey(String),
}

impl ConfigError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

/// Failure of a subvolume primitive.
#[derive(Debug, Error)]
pub enum SubvolumeError {
    /// The helper binary could not be started.
    #[error("failed to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The helper binary exited unsuccessfully.
    #[error("{command} failed ({status}): {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    /// The destination is already taken.
    #[error("destination already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    /// A filesystem call failed.
    #[error("{op} {}: {source}", path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for subvolume primitives.
pub type SubvolumeResult<T> = Result<T, SubvolumeError>;

/// Why a restore did not complete.
#[derive(Debug, Error)]
pub enum RestoreError {
    /// The group is not in the catalog.
    #[error("no snapshots for group {0}")]
    UnknownGroup(String),

    /// The index is past the end of the group.
    #[error("group {group} has {len} snapshots, index {index} is out of range")]
    IndexOutOfRange {
        group: String,
        index: usize,
        len: usize,
    },

    /// The live subvolume location cannot be derived from the pool directory.
    #[error("invalid restore target for group {0}")]
    InvalidTarget(String),

    /// Moving the live subvolume aside failed; nothing was changed.
    #[error("could not displace {} to {}: {source}", live.display(), broken.display())]
    DisplaceFailed {
        live: PathBuf,
        broken: PathBuf,
        #[source]
        source: SubvolumeError,
    },

    /// Creating the new live subvolume failed.
    ///
    /// When `displaced` is set, the previous live subvolume is still there
    /// and can be renamed back by hand.
    #[error("could not create {} from {}: {source}", target.display(), snapshot.display())]
    CreateFailed {
        snapshot: PathBuf,
        target: PathBuf,
        displaced: Option<PathBuf>,
        #[source]
        source: SubvolumeError,
    },
}

/// Errors reported by the task runner.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// The command could not be started.
    #[error("failed to spawn {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Waiting on the child failed.
    #[error("failed to wait for {command}: {source}")]
    Wait {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The supervising task ended abnormally.
    #[error("task supervisor failed: {0}")]
    Join(String),
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

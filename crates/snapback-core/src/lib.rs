//! Core logic for snapback.
//!
//! This crate provides the state-changing side of snapshot management:
//! - Configuration state (JSON, with defaults and validation)
//! - The subvolume primitive seam and its `btrfs` backend
//! - Restore, purge and broken-cleanup engines
//! - Background execution of the snapshot command
//! - A [`SnapshotManager`] facade tying them together

pub mod cleanup;
pub mod config;
pub mod error;
pub mod manager;
pub mod purge;
pub mod report;
pub mod restore;
pub mod runner;
pub mod subvolume;

pub use cleanup::clean_broken;
pub use config::Config;
pub use error::{
    ConfigError, CoreError, CoreResult, RestoreError, RunnerError, SubvolumeError,
    SubvolumeResult,
};
pub use manager::SnapshotManager;
pub use purge::{purge, purge_candidates};
pub use report::{BatchReport, CleanReport, FailedEntry, PurgeReport};
pub use restore::{restore, restore_at, RestoreOutcome};
pub use runner::{OutputLine, OutputLog, Stream, TaskHandle, TaskRunner, TaskStatus};
pub use subvolume::{BtrfsSubvolumes, SubvolumeOps};

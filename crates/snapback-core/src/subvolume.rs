//! Subvolume primitives.
//!
//! The engines never touch the filesystem's subvolume API directly; they go
//! through [`SubvolumeOps`]. [`BtrfsSubvolumes`] is the production backend.

use crate::error::{SubvolumeError, SubvolumeResult};
use async_trait::async_trait;
use snapback_util::TimingGuard;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

/// Create, rename and delete subvolumes.
///
/// `delete` and `rename` are idempotent: repeating a call that already
/// took effect succeeds without doing anything.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubvolumeOps: Send + Sync {
    /// Materialize a writable subvolume at `dest` from the snapshot `source`.
    async fn create_snapshot(&self, source: &Path, dest: &Path) -> SubvolumeResult<()>;

    /// Move a subvolume. Never overwrites an existing `to`.
    async fn rename(&self, from: &Path, to: &Path) -> SubvolumeResult<()>;

    /// Delete a subvolume.
    async fn delete(&self, path: &Path) -> SubvolumeResult<()>;

    /// Whether anything exists at `path`.
    async fn exists(&self, path: &Path) -> bool;
}

/// `btrfs` command line backend.
#[derive(Debug, Clone)]
pub struct BtrfsSubvolumes {
    binary: PathBuf,
}

impl Default for BtrfsSubvolumes {
    fn default() -> Self {
        Self::new()
    }
}

impl BtrfsSubvolumes {
    /// Use `btrfs` from `PATH`.
    pub fn new() -> Self {
        Self::with_binary("btrfs")
    }

    /// Use a specific `btrfs` binary.
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    async fn btrfs(&self, args: &[&OsStr]) -> SubvolumeResult<()> {
        let command = std::iter::once(self.binary.as_os_str())
            .chain(args.iter().copied())
            .map(|a| a.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ");
        debug!(command = %command, "Running subvolume command");

        let output = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| SubvolumeError::Spawn {
                command: command.clone(),
                source,
            })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(SubvolumeError::CommandFailed {
                command,
                status: output
                    .status
                    .code()
                    .map_or_else(|| "killed by signal".to_string(), |c| format!("exit code {c}")),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

#[async_trait]
impl SubvolumeOps for BtrfsSubvolumes {
    async fn create_snapshot(&self, source: &Path, dest: &Path) -> SubvolumeResult<()> {
        let _timing = TimingGuard::subvolume("snapshot");
        // `btrfs subvolume snapshot` nests the copy inside an existing directory.
        if self.exists(dest).await {
            return Err(SubvolumeError::AlreadyExists(dest.to_path_buf()));
        }
        self.btrfs(&[
            OsStr::new("subvolume"),
            OsStr::new("snapshot"),
            source.as_os_str(),
            dest.as_os_str(),
        ])
        .await?;
        info!("Created {} from {}", dest.display(), source.display());
        Ok(())
    }

    async fn rename(&self, from: &Path, to: &Path) -> SubvolumeResult<()> {
        let _timing = TimingGuard::subvolume("rename");
        let from_exists = self.exists(from).await;
        let to_exists = self.exists(to).await;

        if !from_exists && to_exists {
            debug!("{} already renamed to {}", from.display(), to.display());
            return Ok(());
        }
        if to_exists {
            return Err(SubvolumeError::AlreadyExists(to.to_path_buf()));
        }

        tokio::fs::rename(from, to)
            .await
            .map_err(|source| SubvolumeError::Io {
                op: "rename",
                path: from.to_path_buf(),
                source,
            })?;
        info!("Renamed {} to {}", from.display(), to.display());
        Ok(())
    }

    async fn delete(&self, path: &Path) -> SubvolumeResult<()> {
        let _timing = TimingGuard::subvolume("delete");
        if !self.exists(path).await {
            debug!("{} already gone", path.display());
            return Ok(());
        }
        self.btrfs(&[
            OsStr::new("subvolume"),
            OsStr::new("delete"),
            path.as_os_str(),
        ])
        .await?;
        info!("Deleted {}", path.display());
        Ok(())
    }

    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::symlink_metadata(path).await.is_ok()
    }
}

//! Restore a snapshot over a live subvolume.
//!
//! The live subvolume is renamed aside (displaced) before the new copy is
//! created. If creating the copy fails, the displaced subvolume is left
//! where it is for the operator to rename back; no rollback is attempted.

use crate::config::Config;
use crate::error::{RestoreError, SubvolumeError};
use crate::subvolume::SubvolumeOps;
use chrono::Local;
use serde::Serialize;
use snapback_snapshot::{name, Catalog, GroupId, Timestamp};
use snapback_util::path::join_entry;
use snapback_util::TimingGuard;
use std::path::PathBuf;
use tracing::{error, info, warn};

/// What a successful restore did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestoreOutcome {
    pub group: GroupId,
    /// Name of the snapshot that was restored.
    pub snapshot: String,
    /// The new live subvolume.
    pub target: PathBuf,
    /// Where the previous live subvolume was moved, if there was one.
    pub displaced_to: Option<PathBuf>,
}

impl RestoreOutcome {
    /// Whether a live subvolume was displaced (a reboot is recommended).
    pub fn displaced(&self) -> bool {
        self.displaced_to.is_some()
    }
}

/// Restore `catalog[group][index]` as the live subvolume of `group`.
pub async fn restore(
    ops: &dyn SubvolumeOps,
    config: &Config,
    catalog: &Catalog,
    group: &str,
    index: usize,
) -> Result<RestoreOutcome, RestoreError> {
    let now = Timestamp::from_datetime(Local::now().naive_local());
    restore_at(ops, config, catalog, group, index, now).await
}

/// [`restore`] with an explicit "now" used to name the displaced copy.
pub async fn restore_at(
    ops: &dyn SubvolumeOps,
    config: &Config,
    catalog: &Catalog,
    group: &str,
    index: usize,
    now: Timestamp,
) -> Result<RestoreOutcome, RestoreError> {
    let _timing = TimingGuard::engine("restore");

    let snapshots = catalog
        .group(group)
        .ok_or_else(|| RestoreError::UnknownGroup(group.to_string()))?;
    let chosen = snapshots
        .get(index)
        .ok_or_else(|| RestoreError::IndexOutOfRange {
            group: group.to_string(),
            index,
            len: snapshots.len(),
        })?;
    let group_id = snapshots.id();

    let target = join_entry(&config.pool_dir, group_id.as_str())
        .ok_or_else(|| RestoreError::InvalidTarget(group.to_string()))?;

    info!(
        group = %group_id,
        snapshot = %chosen.name,
        target = %target.display(),
        "Restoring snapshot"
    );

    let displaced_to = if ops.exists(&target).await {
        let broken = join_entry(&config.pool_dir, &name::broken_name(group_id, now))
            .ok_or_else(|| RestoreError::InvalidTarget(group.to_string()))?;

        if ops.exists(&broken).await {
            warn!("Displacement target {} already exists", broken.display());
            return Err(RestoreError::DisplaceFailed {
                live: target,
                source: SubvolumeError::AlreadyExists(broken.clone()),
                broken,
            });
        }

        if let Err(source) = ops.rename(&target, &broken).await {
            error!("Failed to displace {}: {}", target.display(), source);
            return Err(RestoreError::DisplaceFailed {
                live: target,
                broken,
                source,
            });
        }
        info!("Displaced {} to {}", target.display(), broken.display());
        Some(broken)
    } else {
        info!("No live subvolume at {}", target.display());
        None
    };

    if let Err(source) = ops.create_snapshot(&chosen.path, &target).await {
        error!(
            displaced = ?displaced_to,
            "Failed to create {} from {}: {}",
            target.display(),
            chosen.path.display(),
            source
        );
        return Err(RestoreError::CreateFailed {
            snapshot: chosen.path.clone(),
            target,
            displaced: displaced_to,
            source,
        });
    }

    info!(group = %group_id, snapshot = %chosen.name, "Restore complete");
    Ok(RestoreOutcome {
        group: group_id.clone(),
        snapshot: chosen.name.clone(),
        target,
        displaced_to,
    })
}

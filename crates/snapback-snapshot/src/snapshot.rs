//! Snapshot data structures.

use crate::name::{self, DecodeError, GroupId, Timestamp};
use serde::Serialize;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};

/// A read-only, timestamped copy of a subvolume found under the snapshots directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    /// Entry name, e.g. `@home.20250916_112530`.
    pub name: String,

    /// Family this snapshot belongs to.
    pub group: GroupId,

    /// When the snapshot was taken.
    pub timestamp: Timestamp,

    /// Absolute location of the snapshot.
    pub path: PathBuf,
}

impl Snapshot {
    /// Build a snapshot from a directory entry name.
    pub fn from_entry(dir: &Path, name: &str) -> Result<Self, DecodeError> {
        let (group, timestamp) = name::decode(name)?;
        Ok(Self {
            name: name.to_string(),
            group,
            timestamp,
            path: dir.join(name),
        })
    }

    /// Newest first; equal instants fall back to the name.
    fn newest_first(a: &Snapshot, b: &Snapshot) -> Ordering {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| a.name.cmp(&b.name))
    }
}

/// All snapshots of one group, newest first. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotGroup {
    id: GroupId,
    snapshots: Vec<Snapshot>,
}

impl SnapshotGroup {
    /// Build a group, sorting its members newest first.
    ///
    /// Returns `None` for an empty list.
    pub fn new(id: GroupId, mut snapshots: Vec<Snapshot>) -> Option<Self> {
        if snapshots.is_empty() {
            return None;
        }
        snapshots.sort_by(Snapshot::newest_first);
        Some(Self { id, snapshots })
    }

    pub fn id(&self) -> &GroupId {
        &self.id
    }

    /// Members, newest first.
    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    /// The newest snapshot.
    pub fn latest(&self) -> &Snapshot {
        &self.snapshots[0]
    }

    /// Every snapshot except the newest, newest first.
    pub fn all_but_latest(&self) -> &[Snapshot] {
        &self.snapshots[1..]
    }

    pub fn get(&self, index: usize) -> Option<&Snapshot> {
        self.snapshots.get(index)
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Always false for a constructed group.
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

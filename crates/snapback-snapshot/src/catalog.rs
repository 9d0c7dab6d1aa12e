//! Snapshot discovery and the in-memory catalog.

use crate::name::{DecodeError, GroupId};
use crate::{Snapshot, SnapshotError, SnapshotGroup};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info, warn};

/// Every group found by one scan, root group first, the rest by name.
///
/// A catalog describes the directory at the moment it was scanned; rescan
/// after any restore, purge or cleanup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Catalog {
    groups: Vec<SnapshotGroup>,
}

/// Why an entry of the snapshots directory was left out of the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum SkipReason {
    /// The name does not follow `{group}.{timestamp}`.
    Undecodable(String),
    /// The entry is not a directory.
    NotADirectory,
    /// The name is not valid UTF-8.
    NonUtf8,
}

/// An entry left out of the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedEntry {
    pub name: String,
    pub reason: SkipReason,
}

/// Result of scanning a snapshots directory.
///
/// A directory that cannot be listed yields an empty catalog and `error`.
#[derive(Debug, Default)]
pub struct Scan {
    pub catalog: Catalog,
    pub skipped: Vec<SkippedEntry>,
    pub error: Option<SnapshotError>,
}

impl Catalog {
    /// Group snapshots by their group id.
    pub fn from_snapshots(snapshots: impl IntoIterator<Item = Snapshot>) -> Self {
        let mut by_group: BTreeMap<GroupId, Vec<Snapshot>> = BTreeMap::new();
        for snapshot in snapshots {
            by_group
                .entry(snapshot.group.clone())
                .or_default()
                .push(snapshot);
        }

        let mut groups: Vec<SnapshotGroup> = by_group
            .into_iter()
            .filter_map(|(id, members)| SnapshotGroup::new(id, members))
            .collect();
        groups.sort_by(|a, b| {
            (!a.id().is_root(), a.id()).cmp(&(!b.id().is_root(), b.id()))
        });

        Self { groups }
    }

    /// Scan `dir` and build a catalog from the entries that decode.
    pub async fn scan(dir: &Path) -> Scan {
        match read_entries(dir).await {
            Ok((snapshots, skipped)) => {
                let catalog = Self::from_snapshots(snapshots);
                info!(
                    dir = %dir.display(),
                    groups = catalog.len(),
                    snapshots = catalog.snapshot_count(),
                    skipped = skipped.len(),
                    "Scanned snapshots"
                );
                Scan {
                    catalog,
                    skipped,
                    error: None,
                }
            }
            Err(e) => {
                warn!("Snapshot scan failed: {}", e);
                Scan {
                    error: Some(e),
                    ..Default::default()
                }
            }
        }
    }

    /// All groups in catalog order.
    pub fn groups(&self) -> &[SnapshotGroup] {
        &self.groups
    }

    pub fn group(&self, id: &str) -> Option<&SnapshotGroup> {
        self.groups.iter().find(|g| g.id().as_str() == id)
    }

    /// Newest snapshot of a group.
    pub fn latest(&self, id: &str) -> Option<&Snapshot> {
        self.group(id).map(SnapshotGroup::latest)
    }

    /// Everything but the newest snapshot of a group; empty for unknown groups.
    pub fn all_but_latest(&self, id: &str) -> &[Snapshot] {
        self.group(id)
            .map(SnapshotGroup::all_but_latest)
            .unwrap_or(&[])
    }

    pub fn get(&self, id: &str, index: usize) -> Option<&Snapshot> {
        self.group(id).and_then(|g| g.get(index))
    }

    /// Number of groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Number of snapshots across all groups.
    pub fn snapshot_count(&self) -> usize {
        self.groups.iter().map(SnapshotGroup::len).sum()
    }
}

async fn read_entries(dir: &Path) -> Result<(Vec<Snapshot>, Vec<SkippedEntry>), SnapshotError> {
    let mut entries = fs::read_dir(dir)
        .await
        .map_err(|e| SnapshotError::list_failed(dir, e))?;

    let mut snapshots = Vec::new();
    let mut skipped = Vec::new();

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| SnapshotError::list_failed(dir, e))?
    {
        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(raw) => {
                debug!("Skipping non UTF-8 entry: {:?}", raw);
                skipped.push(SkippedEntry {
                    name: raw.to_string_lossy().into_owned(),
                    reason: SkipReason::NonUtf8,
                });
                continue;
            }
        };

        if !is_dir(&entry.path()).await {
            debug!("Skipping non-directory entry: {}", name);
            skipped.push(SkippedEntry {
                name,
                reason: SkipReason::NotADirectory,
            });
            continue;
        }

        match Snapshot::from_entry(dir, &name) {
            Ok(snapshot) => snapshots.push(snapshot),
            Err(e) => {
                debug!("Skipping {}: {}", name, e);
                skipped.push(SkippedEntry {
                    reason: e.into(),
                    name,
                });
            }
        }
    }

    skipped.sort_by(|a, b| a.name.cmp(&b.name));
    Ok((snapshots, skipped))
}

async fn is_dir(path: &Path) -> bool {
    fs::metadata(path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
}

impl From<DecodeError> for SkipReason {
    fn from(err: DecodeError) -> Self {
        SkipReason::Undecodable(err.to_string())
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undecodable(reason) => f.write_str(reason),
            Self::NotADirectory => f.write_str("not a directory"),
            Self::NonUtf8 => f.write_str("name is not valid UTF-8"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn snapshots_dir(entries: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for entry in entries {
            fs::create_dir(dir.path().join(entry)).await.unwrap();
        }
        dir
    }

    #[tokio::test]
    async fn test_scan_groups_and_orders() {
        let dir = snapshots_dir(&[
            "@.20250916T112530",
            "@.20250916_112531",
            "@home.20250101_000000",
        ])
        .await;
        fs::write(dir.path().join("garbage.txt"), "x").await.unwrap();

        let scan = Catalog::scan(dir.path()).await;
        assert!(scan.error.is_none());

        let catalog = scan.catalog;
        let ids: Vec<_> = catalog.groups().iter().map(|g| g.id().as_str()).collect();
        assert_eq!(ids, ["@", "@home"]);

        let root: Vec<_> = catalog
            .group("@")
            .unwrap()
            .snapshots()
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(root, ["@.20250916_112531", "@.20250916T112530"]);

        assert_eq!(scan.skipped.len(), 1);
        assert_eq!(scan.skipped[0].name, "garbage.txt");
        assert_eq!(scan.skipped[0].reason, SkipReason::NotADirectory);
    }

    #[tokio::test]
    async fn test_scan_skips_undecodable_directories() {
        let dir = snapshots_dir(&["@home.20250101_000000", "garbage", "@home.latest"]).await;

        let scan = Catalog::scan(dir.path()).await;
        assert_eq!(scan.catalog.snapshot_count(), 1);
        let skipped: Vec<_> = scan.skipped.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(skipped, ["@home.latest", "garbage"]);
        assert!(scan
            .skipped
            .iter()
            .all(|s| matches!(s.reason, SkipReason::Undecodable(_))));
    }

    #[tokio::test]
    async fn test_scan_discovers_custom_groups() {
        let dir = snapshots_dir(&[
            "@var.20250101_000000",
            "@custom.20250101_000000",
            "@.20250101_000000",
            "@games.20250101_000000",
        ])
        .await;

        let catalog = Catalog::scan(dir.path()).await.catalog;
        let ids: Vec<_> = catalog.groups().iter().map(|g| g.id().as_str()).collect();
        assert_eq!(ids, ["@", "@custom", "@games", "@var"]);
    }

    #[tokio::test]
    async fn test_scan_missing_directory_reports_error() {
        let dir = TempDir::new().unwrap();
        let scan = Catalog::scan(&dir.path().join("missing")).await;

        assert!(scan.catalog.is_empty());
        assert!(matches!(scan.error, Some(SnapshotError::ListFailed { .. })));
    }

    #[tokio::test]
    async fn test_queries() {
        let dir = snapshots_dir(&[
            "@home.20250101_000000",
            "@home.20250201_000000",
            "@home.20250301_000000",
        ])
        .await;
        let catalog = Catalog::scan(dir.path()).await.catalog;

        assert_eq!(catalog.latest("@home").unwrap().name, "@home.20250301_000000");
        let rest: Vec<_> = catalog
            .all_but_latest("@home")
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(rest, ["@home.20250201_000000", "@home.20250101_000000"]);
        assert_eq!(catalog.get("@home", 2).unwrap().name, "@home.20250101_000000");
        assert!(catalog.get("@home", 3).is_none());
        assert!(catalog.latest("@").is_none());
        assert!(catalog.all_but_latest("@").is_empty());
    }

    #[test]
    fn test_catalog_serializes() {
        let catalog = Catalog::from_snapshots(vec![Snapshot::from_entry(
            Path::new("/s"),
            "@.20250101_000000",
        )
        .unwrap()]);
        let json = serde_json::to_value(&catalog).unwrap();
        assert_eq!(json["groups"][0]["id"], "@");
        assert_eq!(json["groups"][0]["snapshots"][0]["name"], "@.20250101_000000");
    }
}

//! Displaced ("broken") copies of live subvolumes.

use crate::name::BrokenName;
use crate::{SnapshotError, SnapshotResult};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// A displaced copy found directly under the pool directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrokenEntry {
    #[serde(flatten)]
    pub name: BrokenName,
    pub path: PathBuf,
}

/// List the displaced copies under `pool_dir`, sorted by name.
///
/// Selection is by name only: anything carrying the `.BROKEN` marker
/// qualifies, whatever follows it.
pub async fn list_broken(pool_dir: &Path) -> SnapshotResult<Vec<BrokenEntry>> {
    let mut entries = fs::read_dir(pool_dir)
        .await
        .map_err(|e| SnapshotError::list_failed(pool_dir, e))?;

    let mut broken = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| SnapshotError::list_failed(pool_dir, e))?
    {
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if let Some(parsed) = BrokenName::parse(&name) {
            debug!("Found displaced copy: {}", name);
            broken.push(BrokenEntry {
                name: parsed,
                path: entry.path(),
            });
        }
    }

    broken.sort_by(|a, b| a.name.name.cmp(&b.name.name));
    Ok(broken)
}

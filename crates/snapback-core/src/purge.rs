//! Retention purge: keep the newest snapshot of every group.

use crate::report::PurgeReport;
use crate::subvolume::SubvolumeOps;
use snapback_snapshot::{Catalog, Snapshot};
use snapback_util::TimingGuard;
use tracing::{info, warn};

/// Snapshots a purge of `catalog` would delete, in catalog order.
pub fn purge_candidates(catalog: &Catalog) -> Vec<&Snapshot> {
    catalog
        .groups()
        .iter()
        .flat_map(|group| group.all_but_latest())
        .collect()
}

/// Delete every snapshot except the newest of each group.
///
/// Deletions are independent: a failure is recorded and the batch goes on.
pub async fn purge(ops: &dyn SubvolumeOps, catalog: &Catalog) -> PurgeReport {
    let _timing = TimingGuard::engine("purge");
    let mut report = PurgeReport::default();

    for group in catalog.groups() {
        info!(
            group = %group.id(),
            keep = %group.latest().name,
            delete = group.all_but_latest().len(),
            "Purging group"
        );
        for snapshot in group.all_but_latest() {
            match ops.delete(&snapshot.path).await {
                Ok(()) => report.record_deleted(&snapshot.name),
                Err(e) => {
                    warn!("Failed to delete {}: {}", snapshot.name, e);
                    report.record_failed(&snapshot.name, e);
                }
            }
        }
    }

    info!(
        deleted = report.deleted.len(),
        failed = report.failed.len(),
        "Purge finished"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SubvolumeError;
    use crate::subvolume::MockSubvolumeOps;
    use std::path::Path;

    fn catalog(names: &[&str]) -> Catalog {
        Catalog::from_snapshots(
            names
                .iter()
                .map(|n| Snapshot::from_entry(Path::new("/snaps"), n).unwrap()),
        )
    }

    #[tokio::test]
    async fn test_keeps_newest_per_group() {
        let catalog = catalog(&[
            "@.20250103_000000",
            "@.20250101_000000",
            "@.20250102_000000",
            "@home.20250101_000000",
        ]);

        let mut ops = MockSubvolumeOps::new();
        ops.expect_delete()
            .withf(|p| p != Path::new("/snaps/@.20250103_000000"))
            .times(2)
            .returning(|_| Ok(()));

        let report = purge(&ops, &catalog).await;
        assert_eq!(report.deleted, ["@.20250102_000000", "@.20250101_000000"]);
        assert!(report.is_success());
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_batch() {
        let catalog = catalog(&[
            "@home.20250103_000000",
            "@home.20250102_000000",
            "@home.20250101_000000",
        ]);

        let mut ops = MockSubvolumeOps::new();
        ops.expect_delete().times(2).returning(|p| {
            if p.ends_with("@home.20250102_000000") {
                Err(SubvolumeError::CommandFailed {
                    command: "btrfs subvolume delete".to_string(),
                    status: "exit code 1".to_string(),
                    stderr: "busy".to_string(),
                })
            } else {
                Ok(())
            }
        });

        let report = purge(&ops, &catalog).await;
        assert_eq!(report.deleted, ["@home.20250101_000000"]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].name, "@home.20250102_000000");
        assert!(report.failed[0].reason.contains("busy"));
    }

    #[tokio::test]
    async fn test_single_snapshot_groups_are_untouched() {
        let catalog = catalog(&["@.20250101_000000", "@home.20250101_000000"]);
        let mut ops = MockSubvolumeOps::new();
        ops.expect_delete().never();

        let report = purge(&ops, &catalog).await;
        assert_eq!(report.attempted(), 0);
        assert!(purge_candidates(&catalog).is_empty());
    }
}

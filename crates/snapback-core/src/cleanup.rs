//! Removal of displaced ("broken") copies.

use crate::config::Config;
use crate::error::CoreResult;
use crate::report::CleanReport;
use crate::subvolume::SubvolumeOps;
use snapback_snapshot::list_broken;
use snapback_util::TimingGuard;
use tracing::{info, warn};

/// Delete every displaced copy directly under the pool directory.
///
/// Fails only when the pool directory cannot be listed; individual delete
/// failures are recorded in the report.
pub async fn clean_broken(ops: &dyn SubvolumeOps, config: &Config) -> CoreResult<CleanReport> {
    let _timing = TimingGuard::engine("clean_broken");
    let broken = list_broken(&config.pool_dir).await?;
    let mut report = CleanReport::default();

    for entry in &broken {
        match ops.delete(&entry.path).await {
            Ok(()) => report.record_deleted(&entry.name.name),
            Err(e) => {
                warn!("Failed to delete {}: {}", entry.name.name, e);
                report.record_failed(&entry.name.name, e);
            }
        }
    }

    info!(
        deleted = report.deleted.len(),
        failed = report.failed.len(),
        "Cleanup finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CoreError, SubvolumeError};
    use crate::subvolume::MockSubvolumeOps;
    use tempfile::TempDir;

    async fn pool(entries: &[&str]) -> (TempDir, Config) {
        let dir = TempDir::new().unwrap();
        for entry in entries {
            tokio::fs::create_dir(dir.path().join(entry)).await.unwrap();
        }
        let config = Config {
            pool_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        (dir, config)
    }

    #[tokio::test]
    async fn test_deletes_only_broken_entries() {
        let (_dir, config) = pool(&[
            "@.BROKEN.20250101_000000",
            "@home.BROKEN.20250102_000000",
            "@home",
        ])
        .await;

        let mut ops = MockSubvolumeOps::new();
        ops.expect_delete()
            .withf(|p| !p.ends_with("@home"))
            .times(2)
            .returning(|_| Ok(()));

        let report = clean_broken(&ops, &config).await.unwrap();
        assert_eq!(
            report.deleted,
            ["@.BROKEN.20250101_000000", "@home.BROKEN.20250102_000000"]
        );
        assert!(report.is_success());
    }

    #[tokio::test]
    async fn test_malformed_timestamp_still_deleted() {
        let (_dir, config) = pool(&["@.BROKEN.not-a-date"]).await;

        let mut ops = MockSubvolumeOps::new();
        ops.expect_delete().times(1).returning(|_| Ok(()));

        let report = clean_broken(&ops, &config).await.unwrap();
        assert_eq!(report.deleted, ["@.BROKEN.not-a-date"]);
    }

    #[tokio::test]
    async fn test_failures_are_collected() {
        let (_dir, config) = pool(&[
            "@.BROKEN.20250101_000000",
            "@home.BROKEN.20250102_000000",
        ])
        .await;

        let mut ops = MockSubvolumeOps::new();
        ops.expect_delete().times(2).returning(|p| {
            if p.ends_with("@.BROKEN.20250101_000000") {
                Err(SubvolumeError::AlreadyExists(p.to_path_buf()))
            } else {
                Ok(())
            }
        });

        let report = clean_broken(&ops, &config).await.unwrap();
        assert_eq!(report.deleted, ["@home.BROKEN.20250102_000000"]);
        assert_eq!(report.failed[0].name, "@.BROKEN.20250101_000000");
    }

    #[tokio::test]
    async fn test_missing_pool_is_an_error() {
        let (dir, mut config) = pool(&[]).await;
        config.pool_dir = dir.path().join("missing");

        let ops = MockSubvolumeOps::new();
        let err = clean_broken(&ops, &config).await.unwrap_err();
        assert!(matches!(err, CoreError::Snapshot(_)));
    }
}

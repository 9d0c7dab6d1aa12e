//! Process-wide facade over the engines.
//!
//! A [`SnapshotManager`] owns the loaded configuration, the subvolume backend
//! and the "reboot recommended" flag. The presentation layer holds one for
//! the lifetime of the process and serializes calls into it.

use crate::cleanup;
use crate::config::Config;
use crate::error::{ConfigError, CoreResult, RestoreError, SubvolumeResult};
use crate::purge;
use crate::report::{CleanReport, PurgeReport};
use crate::restore::{self, RestoreOutcome};
use crate::runner::{TaskHandle, TaskRunner};
use crate::subvolume::{BtrfsSubvolumes, SubvolumeOps};
use snapback_snapshot::{list_broken, BrokenEntry, Catalog, Scan};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Shared handle to configuration, backend and process-wide flags.
#[derive(Clone)]
pub struct SnapshotManager {
    inner: Arc<ManagerInner>,
}

struct ManagerInner {
    config: RwLock<Config>,
    /// Where mutations are saved; `None` keeps them in memory.
    config_path: Option<PathBuf>,
    ops: Arc<dyn SubvolumeOps>,
    runner: TaskRunner,
    reboot_recommended: AtomicBool,
}

impl SnapshotManager {
    pub fn new(config: Config, ops: Arc<dyn SubvolumeOps>) -> Self {
        Self::build(config, None, ops)
    }

    /// Load the config at `path` and use the `btrfs` backend.
    pub async fn load(path: &Path) -> CoreResult<Self> {
        let config = Config::load(path).await?;
        Ok(Self::build(
            config,
            Some(path.to_path_buf()),
            Arc::new(BtrfsSubvolumes::new()),
        ))
    }

    /// Like [`SnapshotManager::new`], saving config mutations to `path`.
    pub fn with_config_path(
        config: Config,
        path: impl Into<PathBuf>,
        ops: Arc<dyn SubvolumeOps>,
    ) -> Self {
        Self::build(config, Some(path.into()), ops)
    }

    fn build(config: Config, config_path: Option<PathBuf>, ops: Arc<dyn SubvolumeOps>) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                config: RwLock::new(config),
                config_path,
                ops,
                runner: TaskRunner::new(),
                reboot_recommended: AtomicBool::new(false),
            }),
        }
    }

    /// Current configuration.
    pub async fn config(&self) -> Config {
        self.inner.config.read().await.clone()
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.inner.config_path.as_deref()
    }

    /// Change one setting and save the result.
    ///
    /// Nothing changes when the value is rejected or the save fails.
    pub async fn set_config(&self, key: &str, value: &str) -> CoreResult<()> {
        let mut config = self.inner.config.write().await;
        let mut updated = config.clone();
        updated.set(key, value)?;
        if let Some(path) = &self.inner.config_path {
            updated.save(path).await?;
        }
        info!(key, value, "Updated setting");
        *config = updated;
        Ok(())
    }

    /// Flip a boolean setting and save the result. Returns the new value.
    pub async fn toggle_config(&self, key: &str) -> CoreResult<bool> {
        let mut config = self.inner.config.write().await;
        let mut updated = config.clone();
        let value = updated.toggle(key)?;
        if let Some(path) = &self.inner.config_path {
            updated.save(path).await?;
        }
        info!(key, value, "Toggled setting");
        *config = updated;
        Ok(value)
    }

    /// Scan the snapshots directory.
    pub async fn scan(&self) -> Scan {
        let dir = self.inner.config.read().await.snapshots_dir.clone();
        Catalog::scan(&dir).await
    }

    /// Restore `group[index]` from `catalog`.
    ///
    /// Sets the reboot flag when a live subvolume was displaced.
    pub async fn restore(
        &self,
        catalog: &Catalog,
        group: &str,
        index: usize,
    ) -> Result<RestoreOutcome, RestoreError> {
        let config = self.config().await;
        let outcome =
            restore::restore(self.inner.ops.as_ref(), &config, catalog, group, index).await?;
        if outcome.displaced() {
            self.inner.reboot_recommended.store(true, Ordering::SeqCst);
        }
        Ok(outcome)
    }

    /// Delete the copy a restore displaced, if any.
    ///
    /// Returns whether something was deleted. Callers treat an error as a
    /// warning: the restore itself already succeeded.
    pub async fn discard_displaced(&self, outcome: &RestoreOutcome) -> SubvolumeResult<bool> {
        let Some(displaced) = &outcome.displaced_to else {
            return Ok(false);
        };
        match self.inner.ops.delete(displaced).await {
            Ok(()) => {
                info!("Removed displaced copy {}", displaced.display());
                Ok(true)
            }
            Err(e) => {
                warn!("Could not remove displaced copy {}: {}", displaced.display(), e);
                Err(e)
            }
        }
    }

    pub async fn purge(&self, catalog: &Catalog) -> PurgeReport {
        purge::purge(self.inner.ops.as_ref(), catalog).await
    }

    pub async fn clean_broken(&self) -> CoreResult<CleanReport> {
        let config = self.config().await;
        cleanup::clean_broken(self.inner.ops.as_ref(), &config).await
    }

    /// Displaced copies currently under the pool directory.
    pub async fn find_broken(&self) -> CoreResult<Vec<BrokenEntry>> {
        let pool_dir = self.inner.config.read().await.pool_dir.clone();
        Ok(list_broken(&pool_dir).await?)
    }

    /// True once any restore in this process displaced a live subvolume.
    pub fn reboot_recommended(&self) -> bool {
        self.inner.reboot_recommended.load(Ordering::SeqCst)
    }

    /// Start the configured snapshot command in the background.
    pub async fn run_snapshot_command(&self) -> CoreResult<TaskHandle> {
        let command = self.inner.config.read().await.snapshot_command.clone();
        let (program, args) = command
            .split_first()
            .ok_or_else(|| ConfigError::validation("snapshot_command must not be empty"))?;
        Ok(self.inner.runner.run(program, args)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subvolume::MockSubvolumeOps;
    use snapback_snapshot::Snapshot;
    use tempfile::TempDir;

    fn catalog() -> Catalog {
        Catalog::from_snapshots(
            ["@home.20250102_000000", "@home.20250101_000000"]
                .iter()
                .map(|n| Snapshot::from_entry(Path::new("/snaps"), n).unwrap()),
        )
    }

    fn config() -> Config {
        Config {
            pool_dir: PathBuf::from("/pool"),
            snapshots_dir: PathBuf::from("/snaps"),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_restore_with_displacement_recommends_reboot() {
        let mut ops = MockSubvolumeOps::new();
        ops.expect_exists().returning(|p| p == Path::new("/pool/@home"));
        ops.expect_rename().times(1).returning(|_, _| Ok(()));
        ops.expect_create_snapshot().times(1).returning(|_, _| Ok(()));

        let manager = SnapshotManager::new(config(), Arc::new(ops));
        assert!(!manager.reboot_recommended());

        let outcome = manager.restore(&catalog(), "@home", 1).await.unwrap();
        assert_eq!(outcome.snapshot, "@home.20250101_000000");
        assert!(outcome.displaced());
        assert!(manager.reboot_recommended());
    }

    #[tokio::test]
    async fn test_restore_without_live_subvolume_keeps_flag_clear() {
        let mut ops = MockSubvolumeOps::new();
        ops.expect_exists().returning(|_| false);
        ops.expect_rename().never();
        ops.expect_create_snapshot().times(1).returning(|_, _| Ok(()));

        let manager = SnapshotManager::new(config(), Arc::new(ops));
        let outcome = manager.restore(&catalog(), "@home", 0).await.unwrap();
        assert!(!outcome.displaced());
        assert!(!manager.reboot_recommended());
    }

    #[tokio::test]
    async fn test_discard_displaced() {
        let mut ops = MockSubvolumeOps::new();
        ops.expect_delete()
            .withf(|p| p == Path::new("/pool/@home.BROKEN.20250103_000000"))
            .times(1)
            .returning(|_| Ok(()));

        let manager = SnapshotManager::new(config(), Arc::new(ops));
        let mut outcome = RestoreOutcome {
            group: snapback_snapshot::GroupId::parse("@home").unwrap(),
            snapshot: "@home.20250102_000000".to_string(),
            target: PathBuf::from("/pool/@home"),
            displaced_to: Some(PathBuf::from("/pool/@home.BROKEN.20250103_000000")),
        };
        assert!(manager.discard_displaced(&outcome).await.unwrap());

        outcome.displaced_to = None;
        assert!(!manager.discard_displaced(&outcome).await.unwrap());
    }

    #[tokio::test]
    async fn test_set_config_saves_and_rejects_bad_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        let manager =
            SnapshotManager::with_config_path(config(), &path, Arc::new(MockSubvolumeOps::new()));

        manager.set_config("auto_cleanup", "yes").await.unwrap();
        assert!(manager.config().await.auto_cleanup);
        assert!(Config::load(&path).await.unwrap().auto_cleanup);

        assert!(manager.set_config("pool_dir", "relative").await.is_err());
        assert_eq!(manager.config().await.pool_dir, PathBuf::from("/pool"));
    }

    #[tokio::test]
    async fn test_toggle_config_saves_flag() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        let manager =
            SnapshotManager::with_config_path(config(), &path, Arc::new(MockSubvolumeOps::new()));

        assert!(!manager.toggle_config("show_timestamps").await.unwrap());
        assert!(!manager.config().await.show_timestamps);
        assert!(!Config::load(&path).await.unwrap().show_timestamps);

        assert!(manager.toggle_config("snapshots_dir").await.is_err());
        assert!(manager.toggle_config("no_such_key").await.is_err());
        assert_eq!(manager.config().await.snapshots_dir, PathBuf::from("/snaps"));
    }

    #[tokio::test]
    async fn test_find_broken_uses_pool_dir() {
        let dir = TempDir::new().unwrap();
        tokio::fs::create_dir(dir.path().join("@home.BROKEN.20250101_000000"))
            .await
            .unwrap();
        tokio::fs::create_dir(dir.path().join("@home")).await.unwrap();

        let config = Config {
            pool_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let manager = SnapshotManager::new(config, Arc::new(MockSubvolumeOps::new()));
        let broken = manager.find_broken().await.unwrap();
        assert_eq!(broken.len(), 1);
        assert_eq!(broken[0].name.origin, "@home");
    }

    #[tokio::test]
    async fn test_run_snapshot_command() {
        let config = Config {
            snapshot_command: vec!["sh".into(), "-c".into(), "echo snapshot taken".into()],
            ..Default::default()
        };
        let manager = SnapshotManager::new(config, Arc::new(MockSubvolumeOps::new()));
        let handle = manager.run_snapshot_command().await.unwrap();
        let log = handle.log().clone();
        assert!(handle.wait().await.unwrap().success());
        assert_eq!(log.snapshot().await[0].text, "snapshot taken");
    }
}

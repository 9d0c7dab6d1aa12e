//! Purge and cleanup handlers.

use super::prompt::{confirm, describe, finish_report};
use snapback_core::{purge_candidates, SnapshotManager};

/// Delete all but the newest snapshot of every group.
pub async fn handle_purge(manager: &SnapshotManager, yes: bool) -> anyhow::Result<()> {
    let config = manager.config().await;
    let scan = manager.scan().await;
    if let Some(err) = scan.error {
        anyhow::bail!(err);
    }

    let candidates = purge_candidates(&scan.catalog);
    if candidates.is_empty() {
        println!("Nothing to purge.");
        return Ok(());
    }

    println!("Snapshots to delete:");
    for snapshot in &candidates {
        println!("  {}", describe(snapshot, config.show_timestamps));
    }
    let question = format!("Delete {} snapshots?", candidates.len());
    if !confirm(&config, yes, &question)? {
        println!("Purge cancelled.");
        return Ok(());
    }

    let report = manager.purge(&scan.catalog).await;
    finish_report("Purge", &report)
}

/// Delete every displaced copy under the pool directory.
pub async fn handle_clean(manager: &SnapshotManager, yes: bool) -> anyhow::Result<()> {
    let config = manager.config().await;
    let broken = manager.find_broken().await?;
    if broken.is_empty() {
        println!("No displaced copies found.");
        return Ok(());
    }

    println!("Displaced copies to delete:");
    for entry in &broken {
        println!("  {}", entry.name.name);
    }
    let question = format!("Delete {} displaced copies?", broken.len());
    if !confirm(&config, yes, &question)? {
        println!("Cleanup cancelled.");
        return Ok(());
    }

    let report = manager.clean_broken().await?;
    finish_report("Cleanup", &report)
}

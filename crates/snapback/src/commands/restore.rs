//! Restoring a snapshot over a live subvolume.

use super::prompt::{confirm, describe};
use snapback_core::{RestoreError, SnapshotManager, TaskRunner};

/// Restore `group[index]` and handle auto-cleanup and reboot.
pub async fn handle_restore(
    manager: &SnapshotManager,
    group: &str,
    index: usize,
    yes: bool,
    reboot: bool,
) -> anyhow::Result<()> {
    let config = manager.config().await;
    let scan = manager.scan().await;
    if let Some(err) = scan.error {
        anyhow::bail!(err);
    }
    let catalog = scan.catalog;

    if let Some(snapshot) = catalog.get(group, index) {
        let question = format!(
            "Restore {} as {}?",
            describe(snapshot, config.show_timestamps),
            config.pool_dir.join(group).display()
        );
        if !confirm(&config, yes, &question)? {
            println!("Restore cancelled.");
            return Ok(());
        }
    }

    let outcome = match manager.restore(&catalog, group, index).await {
        Ok(outcome) => outcome,
        Err(e) => {
            if let RestoreError::CreateFailed {
                displaced: Some(displaced),
                ..
            } = &e
            {
                eprintln!(
                    "The previous subvolume was kept at {}; rename it back to recover.",
                    displaced.display()
                );
            }
            return Err(e.into());
        }
    };

    println!(
        "Restored {} to {}",
        outcome.snapshot,
        outcome.target.display()
    );
    if let Some(displaced) = &outcome.displaced_to {
        println!("Previous subvolume moved to {}", displaced.display());
        if config.auto_cleanup {
            match manager.discard_displaced(&outcome).await {
                Ok(_) => println!("Removed {}", displaced.display()),
                Err(e) => eprintln!("Warning: could not remove {}: {e}", displaced.display()),
            }
        }
    }

    if manager.reboot_recommended() {
        if reboot {
            println!("Rebooting...");
            let status = TaskRunner::new().run("reboot", &[])?.wait().await?;
            if !status.success() {
                anyhow::bail!("reboot failed: {status:?}");
            }
        } else {
            println!("A reboot is recommended for the restored subvolume to take effect.");
        }
    }

    Ok(())
}

//! Listing snapshots and displaced copies.

use super::prompt::describe;
use snapback_core::SnapshotManager;
use tracing::warn;

/// Print the catalog, skipped entries and displaced copies.
pub async fn handle_list(manager: &SnapshotManager, json: bool) -> anyhow::Result<()> {
    let config = manager.config().await;
    let scan = manager.scan().await;
    if let Some(err) = scan.error {
        anyhow::bail!(err);
    }

    let broken = match manager.find_broken().await {
        Ok(broken) => broken,
        Err(e) => {
            warn!("Could not list displaced copies: {}", e);
            Vec::new()
        }
    };

    if json {
        let value = serde_json::json!({
            "groups": scan.catalog.groups(),
            "skipped": scan.skipped,
            "broken": broken,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    if scan.catalog.is_empty() {
        println!("No snapshots found in {}", config.snapshots_dir.display());
    }

    for group in scan.catalog.groups() {
        println!("{} ({} snapshots)", group.id(), group.len());
        for (index, snapshot) in group.snapshots().iter().enumerate() {
            let marker = if index == 0 { "  latest" } else { "" };
            println!(
                "  [{index}] {}{marker}",
                describe(snapshot, config.show_timestamps)
            );
        }
    }

    if !scan.skipped.is_empty() {
        println!();
        println!("Skipped entries:");
        for entry in &scan.skipped {
            println!("  {}: {}", entry.name, entry.reason);
        }
    }

    if !broken.is_empty() {
        println!();
        println!("Displaced copies (remove with `snapback clean`):");
        for entry in &broken {
            match entry.name.displaced_at {
                Some(at) if config.show_timestamps => {
                    println!("  {} ({})", entry.name.name, at.to_display())
                }
                _ => println!("  {}", entry.name.name),
            }
        }
    }

    Ok(())
}

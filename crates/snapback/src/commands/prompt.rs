//! Shared helpers for command handlers.

use anyhow::Context;
use snapback_core::{BatchReport, Config, SnapshotManager};
use snapback_snapshot::Snapshot;
use std::io::{self, Write};
use std::path::Path;

/// Load the manager from `--config` or the default config location.
pub async fn open_manager(config: Option<&Path>) -> anyhow::Result<SnapshotManager> {
    let path = match config {
        Some(path) => path.to_path_buf(),
        None => Config::default_path().context("Could not determine config directory")?,
    };
    SnapshotManager::load(&path)
        .await
        .with_context(|| format!("Failed to load config from {}", path.display()))
}

/// Ask a yes/no question unless `yes` was given or confirmations are off.
pub fn confirm(config: &Config, yes: bool, question: &str) -> anyhow::Result<bool> {
    if yes || !config.confirm_actions {
        return Ok(true);
    }

    print!("{question} [y/N] ");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(matches!(input.trim().to_lowercase().as_str(), "y" | "yes"))
}

/// `name` or `name (YYYY-MM-DD HH:MM:SS)`.
pub fn describe(snapshot: &Snapshot, show_timestamps: bool) -> String {
    if show_timestamps {
        format!("{} ({})", snapshot.name, snapshot.timestamp.to_display())
    } else {
        snapshot.name.clone()
    }
}

/// Print a batch report; an error when anything failed.
pub fn finish_report(verb: &str, report: &BatchReport) -> anyhow::Result<()> {
    for name in &report.deleted {
        println!("  deleted {name}");
    }
    for failed in &report.failed {
        println!("  FAILED  {}: {}", failed.name, failed.reason);
    }
    println!(
        "{verb}: {} deleted, {} failed",
        report.deleted.len(),
        report.failed.len()
    );

    if report.is_success() {
        Ok(())
    } else {
        anyhow::bail!("{} of {} deletions failed", report.failed.len(), report.attempted())
    }
}

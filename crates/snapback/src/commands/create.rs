//! Taking a new batch of snapshots.

use snapback_core::{SnapshotManager, Stream, TaskStatus};

/// Run the configured snapshot command, streaming its output.
///
/// Ctrl-C cancels the command.
pub async fn handle_create(manager: &SnapshotManager) -> anyhow::Result<()> {
    let handle = manager.run_snapshot_command().await?;
    let command = handle.command().to_string();
    println!("Running {command}");

    let cancel = handle.cancel_token();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let log = handle.log().clone();
    let mut seen = 0;
    while log.wait_for_more(seen).await {
        for line in log.lines_from(seen).await {
            match line.stream {
                Stream::Stdout => println!("{}", line.text),
                Stream::Stderr => eprintln!("{}", line.text),
            }
            seen += 1;
        }
    }

    let status = handle.wait().await;
    interrupt.abort();

    match status? {
        TaskStatus::Exited(status) if status.success() => {
            println!("Snapshot run finished.");
            Ok(())
        }
        TaskStatus::Exited(status) => anyhow::bail!("{command} failed: {status}"),
        TaskStatus::Cancelled => anyhow::bail!("{command} was cancelled"),
    }
}

//! snapback - restore, purge and clean up btrbk snapshots.
//!
//! This is the main entry point for the snapback CLI.

mod commands;

use clap::{Parser, Subcommand};
use commands::*;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "snapback")]
#[command(author, version, about = "Restore and prune btrbk snapshots", long_about = None)]
struct Cli {
    /// Config file (default: ~/.config/snapback/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Subcommand
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List snapshot groups and displaced copies
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Restore a snapshot as the live subvolume of its group
    Restore {
        /// Group to restore (e.g. @home)
        group: String,
        /// Position in the group, 0 is the newest
        #[arg(default_value_t = 0)]
        index: usize,
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
        /// Reboot after a restore that replaced a live subvolume
        #[arg(long)]
        reboot: bool,
    },
    /// Delete all but the newest snapshot of every group
    Purge {
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Delete displaced (.BROKEN) copies left by earlier restores
    Clean {
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Take a new batch of snapshots with the configured command
    Create,
    /// Show or change settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_file = init_logging(cli.verbose);
    if let Some(path) = &log_file {
        tracing::debug!(path = %path.display(), "Logging to file");
    }

    let manager = open_manager(cli.config.as_deref()).await?;

    let result = match cli.command {
        Commands::List { json } => handle_list(&manager, json).await,
        Commands::Restore {
            group,
            index,
            yes,
            reboot,
        } => handle_restore(&manager, &group, index, yes, reboot).await,
        Commands::Purge { yes } => handle_purge(&manager, yes).await,
        Commands::Clean { yes } => handle_clean(&manager, yes).await,
        Commands::Create => handle_create(&manager).await,
        Commands::Config { command } => handle_config(command, &manager).await,
    };

    if let Err(e) = &result {
        tracing::error!("{:#}", e);
    }
    result
}

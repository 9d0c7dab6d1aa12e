//! Configuration command handlers.

use clap::Subcommand;
use snapback_core::SnapshotManager;

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,
    /// Print the config file location
    Path,
    /// Print one setting
    Get {
        /// Setting name
        key: String,
    },
    /// Change one setting and save
    Set {
        /// Setting name
        key: String,
        /// New value
        value: String,
    },
    /// Flip an on/off setting and save
    Toggle {
        /// Setting name
        key: String,
    },
}

/// Handle config commands.
pub async fn handle_config(command: ConfigCommands, manager: &SnapshotManager) -> anyhow::Result<()> {
    match command {
        ConfigCommands::Show => {
            let config = manager.config().await;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigCommands::Path => match manager.config_path() {
            Some(path) => println!("{}", path.display()),
            None => println!("(in memory)"),
        },
        ConfigCommands::Get { key } => {
            println!("{}", manager.config().await.get(&key)?);
        }
        ConfigCommands::Set { key, value } => {
            manager.set_config(&key, &value).await?;
            println!("{key} = {}", manager.config().await.get(&key)?);
        }
        ConfigCommands::Toggle { key } => {
            let value = manager.toggle_config(&key).await?;
            println!("{key} = {value}");
        }
    }
    Ok(())
}

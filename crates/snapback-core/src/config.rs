//! Configuration management for snapback.
//!
//! Configuration lives in a single JSON file, by default
//! `~/.config/snapback/config.json`. It is loaded once at startup and the
//! settings surface saves it after every mutation. Files written by older
//! btrbk restore tools (`btr_pool_dir`) load unchanged.

use crate::error::{ConfigError, CoreResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Tunable paths and flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root under which live subvolumes and displaced copies live.
    #[serde(alias = "btr_pool_dir")]
    pub pool_dir: PathBuf,

    /// Root under which snapshots are scanned.
    pub snapshots_dir: PathBuf,

    /// Delete the displaced copy right after a successful restore.
    pub auto_cleanup: bool,

    /// Ask before restore, purge and cleanup.
    pub confirm_actions: bool,

    /// Show decoded timestamps next to snapshot names.
    pub show_timestamps: bool,

    /// Theme name for the presentation layer.
    pub theme: String,

    /// Command that takes a new batch of snapshots.
    pub snapshot_command: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pool_dir: PathBuf::from("/mnt/btr_pool"),
            snapshots_dir: PathBuf::from("/mnt/btr_pool/btrbk_snapshots"),
            auto_cleanup: false,
            confirm_actions: true,
            show_timestamps: true,
            theme: "default".to_string(),
            snapshot_command: vec!["btrbk".into(), "run".into(), "--progress".into()],
        }
    }
}

/// Names accepted by [`Config::set`] and [`Config::get`].
pub const KEYS: [&str; 7] = [
    "pool_dir",
    "snapshots_dir",
    "auto_cleanup",
    "confirm_actions",
    "show_timestamps",
    "theme",
    "snapshot_command",
];

impl Config {
    /// Default config file location.
    pub fn default_path() -> Option<PathBuf> {
        snapback_util::path::config_file()
    }

    /// Load configuration from `path`.
    ///
    /// A missing file yields the defaults.
    pub async fn load(path: &Path) -> CoreResult<Self> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config: Self =
            serde_json::from_str(&content).map_err(|e| ConfigError::InvalidJson {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to `path`, creating parent directories.
    pub async fn save(&self, path: &Path) -> CoreResult<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(self).map_err(|e| ConfigError::InvalidJson {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        tokio::fs::write(path, content).await?;
        tracing::info!("Saved configuration to {}", path.display());
        Ok(())
    }

    /// Check invariants the engines rely on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, path) in [("pool_dir", &self.pool_dir), ("snapshots_dir", &self.snapshots_dir)] {
            if !path.is_absolute() {
                return Err(ConfigError::validation(format!(
                    "{key} must be an absolute path, got {}",
                    path.display()
                )));
            }
        }
        if self.snapshot_command.first().map_or(true, |c| c.trim().is_empty()) {
            return Err(ConfigError::validation("snapshot_command must not be empty"));
        }
        Ok(())
    }

    /// Render one setting as a string.
    pub fn get(&self, key: &str) -> Result<String, ConfigError> {
        let value = match key {
            "pool_dir" => self.pool_dir.display().to_string(),
            "snapshots_dir" => self.snapshots_dir.display().to_string(),
            "auto_cleanup" => self.auto_cleanup.to_string(),
            "confirm_actions" => self.confirm_actions.to_string(),
            "show_timestamps" => self.show_timestamps.to_string(),
            "theme" => self.theme.clone(),
            "snapshot_command" => self.snapshot_command.join(" "),
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        };
        Ok(value)
    }

    /// Update one setting from its string form.
    ///
    /// The config is left untouched when the new value does not validate.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut updated = self.clone();
        match key {
            "pool_dir" => updated.pool_dir = PathBuf::from(value),
            "snapshots_dir" => updated.snapshots_dir = PathBuf::from(value),
            "auto_cleanup" => updated.auto_cleanup = parse_bool(key, value)?,
            "confirm_actions" => updated.confirm_actions = parse_bool(key, value)?,
            "show_timestamps" => updated.show_timestamps = parse_bool(key, value)?,
            "theme" => updated.theme = value.to_string(),
            "snapshot_command" => {
                updated.snapshot_command = value.split_whitespace().map(String::from).collect()
            }
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Flip a boolean setting.
    pub fn toggle(&mut self, key: &str) -> Result<bool, ConfigError> {
        let flag = match key {
            "auto_cleanup" => &mut self.auto_cleanup,
            "confirm_actions" => &mut self.confirm_actions,
            "show_timestamps" => &mut self.show_timestamps,
            _ if KEYS.contains(&key) => {
                return Err(ConfigError::validation(format!("{key} is not a flag")))
            }
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        };
        *flag = !*flag;
        Ok(*flag)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        other => Err(ConfigError::validation(format!(
            "{key} expects true or false, got {other:?}"
        ))),
    }
}

//! Configuration loading and management
//!
//! Handles parsing of `taskmirror.toml` configuration files.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const CONFIG_FILE: &str = "taskmirror.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// Directory holding the task list, ledger and filters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// Remote store configuration
    #[serde(default)]
    pub sync: SyncConfig,

    /// Reminder configuration
    #[serde(default)]
    pub notifications: NotificationConfig,
}

/// How the remote store is reached
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncConfig {
    /// Store binary to run
    #[serde(default = "default_command")]
    pub command: String,

    /// Extra arguments placed before every subcommand (e.g. `rc.data.location=...`)
    #[serde(default)]
    pub args: Vec<String>,

    /// Run the store's own `sync` between import and export
    #[serde(default = "default_true")]
    pub run_sync: bool,

    /// Upper bound for each store invocation
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_command() -> String {
    "task".to_string()
}

fn default_true() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            command: default_command(),
            args: Vec::new(),
            run_sync: default_true(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Due-date reminder configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Minutes before the due time a reminder fires
    #[serde(default = "default_lead_minutes")]
    pub lead_minutes: i64,
}

/// One year.
pub const MAX_LEAD_MINUTES: i64 = 525_600;

fn default_lead_minutes() -> i64 {
    15
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            lead_minutes: default_lead_minutes(),
        }
    }
}

impl Config {
    /// Platform config path (e.g. `~/.config/taskmirror/taskmirror.toml`)
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "taskmirror").map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }

    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration if the file exists, or return defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) if path.exists() => Self::load(path),
            _ => Ok(Self::default()),
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        self.sync.validate()?;
        self.notifications.validate()?;
        if let Some(dir) = &self.data_dir {
            if dir.as_os_str().is_empty() {
                return Err(Error::InvalidConfig("data_dir cannot be empty".to_string()));
            }
        }
        Ok(())
    }
}

impl SyncConfig {
    fn validate(&self) -> Result<()> {
        if self.command.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "sync.command cannot be empty".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(Error::InvalidConfig(
                "sync.timeout_secs must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl NotificationConfig {
    fn validate(&self) -> Result<()> {
        if self.lead_minutes < 0 {
            return Err(Error::InvalidConfig(
                "notifications.lead_minutes must be >= 0".to_string(),
            ));
        }
        if self.lead_minutes > MAX_LEAD_MINUTES {
            return Err(Error::InvalidConfig(format!(
                "notifications.lead_minutes must be <= {MAX_LEAD_MINUTES}"
            )));
        }
        Ok(())
    }
}

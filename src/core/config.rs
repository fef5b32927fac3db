//! Application configuration management
//!
//! Handles loading and saving application settings including:
//! - Branch prefix pattern and message template
//! - Change notification strategy and polling interval
//! - Message buffer location

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::core::pattern::PrefixConfig;
use crate::error::{PrefixError, Result};

/// How the daemon learns about repository changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum NotifierKind {
    /// File system events (default)
    #[default]
    Push,
    /// Periodic metadata checks, for file systems without change events
    Poll,
}

impl NotifierKind {
    /// Get the configuration identifier
    pub fn name(&self) -> &'static str {
        match self {
            NotifierKind::Push => "push",
            NotifierKind::Poll => "poll",
        }
    }

    /// Get a human-readable description
    pub fn display_name(&self) -> &'static str {
        match self {
            NotifierKind::Push => "File system events",
            NotifierKind::Poll => "Interval polling",
        }
    }

    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "push" => Some(NotifierKind::Push),
            "poll" => Some(NotifierKind::Poll),
            _ => None,
        }
    }

    /// Get all available strategies
    pub fn all() -> &'static [NotifierKind] {
        &[NotifierKind::Push, NotifierKind::Poll]
    }
}

impl std::fmt::Display for NotifierKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Application settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Pattern with one capture group, matched against branch names
    #[serde(default = "default_prefix_pattern")]
    pub prefix_pattern: String,

    /// Template with `${prefix}` and `${message}` placeholders
    #[serde(default = "default_message_format")]
    pub message_format: String,

    /// Polling interval in milliseconds for the poll notifier
    #[serde(default = "default_watch_interval")]
    pub watch_interval_ms: u64,

    /// Change notification strategy
    #[serde(default)]
    pub notifier: NotifierKind,

    /// Message buffer file name, relative to the git directory
    #[serde(default = "default_message_file")]
    pub message_file: String,
}

fn default_prefix_pattern() -> String {
    r"(ML-\d+)-.*".to_string()
}

fn default_message_format() -> String {
    "[${prefix}] ${message}".to_string()
}

fn default_watch_interval() -> u64 {
    1000
}

fn default_message_file() -> String {
    "COMMIT_DRAFT".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            prefix_pattern: default_prefix_pattern(),
            message_format: default_message_format(),
            watch_interval_ms: default_watch_interval(),
            notifier: NotifierKind::default(),
            message_file: default_message_file(),
        }
    }
}

impl Settings {
    /// Load settings from a specific file, or defaults if it doesn't exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)?;
            let settings: Settings = toml::from_str(&contents)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;

        Ok(())
    }

    /// Resolve the settings file location, honoring an explicit override
    pub fn locate(explicit: Option<&Path>) -> Result<PathBuf> {
        match explicit {
            Some(path) => Ok(path.to_path_buf()),
            None => Self::config_path(),
        }
    }

    /// Get the default configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let project_dirs = ProjectDirs::from("com", "commit-prefix", "commit-prefix")
            .ok_or_else(|| PrefixError::Config("Could not determine config directory".into()))?;

        Ok(project_dirs.config_dir().join("config.toml"))
    }

    /// Compile the prefix configuration
    pub fn resolve(&self) -> Result<PrefixConfig> {
        PrefixConfig::resolve(&self.prefix_pattern, &self.message_format)
    }

    /// Get the poll interval as a Duration
    pub fn watch_interval(&self) -> Duration {
        Duration::from_millis(self.watch_interval_ms.max(1))
    }
}

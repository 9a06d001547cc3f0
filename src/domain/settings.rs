//! Tool configuration loaded from `config.toml`.
//!
//! Separate from [`ExportConfig`](super::ExportConfig): these settings tune
//! how exports run, not what gets exported.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Settings for the enrichment and formatting pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportSettings {
    /// Entries whose visits are looked up concurrently per batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// `strftime` pattern for formatted timestamps.
    #[serde(default = "default_date_format")]
    pub date_format: String,

    /// Format timestamps in UTC instead of the local time zone.
    #[serde(default)]
    pub utc: bool,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            date_format: default_date_format(),
            utc: false,
        }
    }
}

const fn default_batch_size() -> usize {
    50
}

fn default_date_format() -> String {
    "%-m/%-d/%Y, %-I:%M:%S %p".to_string()
}

/// Path configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathConfig {
    /// Base data directory.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// History database to read instead of auto-discovery.
    #[serde(default)]
    pub history_db: Option<PathBuf>,

    /// Directory exported files are written to.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

/// Complete application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub export: ExportSettings,

    #[serde(default)]
    pub paths: PathConfig,
}

impl AppConfig {
    /// Get the data directory, using default if not configured.
    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.paths
            .data_dir
            .clone()
            .unwrap_or_else(Self::default_data_dir)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".history-export")
    }

    /// Path of the persisted export settings.
    #[must_use]
    pub fn settings_file_path(&self) -> PathBuf {
        self.data_dir().join("settings.json")
    }

    /// Directory exports land in, defaulting to the current directory.
    #[must_use]
    pub fn output_dir(&self) -> PathBuf {
        self.paths
            .output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

//! Configuration for the health merge tool.

use crate::core::metrics::DEFAULT_LOW_SLEEP_THRESHOLD_HOURS;
use crate::core::timestamp::StaticTimezoneRegistry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Main configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Nights shorter than this count as low sleep
    pub low_sleep_threshold_hours: f64,

    /// Default directory for written reports
    pub export_path: PathBuf,

    /// Normalize the two feeds on separate worker threads
    pub parallel: bool,

    /// Pretty-print JSON output
    pub pretty: bool,

    /// Extra timezone labels, mapped to IANA zone names
    pub timezone_aliases: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("synheart-health-merge");

        Self {
            low_sleep_threshold_hours: DEFAULT_LOW_SLEEP_THRESHOLD_HOURS,
            export_path: data_dir.join("exports"),
            parallel: true,
            pretty: true,
            timezone_aliases: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from a specific file. A missing file yields defaults.
    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("synheart-health-merge")
            .join("config.json")
    }

    /// Ensure the export directory exists.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.export_path).map_err(|e| ConfigError::IoError(e.to_string()))
    }

    /// The default timezone table plus any configured aliases.
    pub fn build_registry(&self) -> Result<StaticTimezoneRegistry, ConfigError> {
        self.timezone_aliases.iter().try_fold(
            StaticTimezoneRegistry::default(),
            |registry, (label, iana)| {
                registry
                    .with_iana_alias(label.clone(), iana)
                    .map_err(|e| ConfigError::InvalidTimezone(format!("{label} -> {iana}: {e}")))
            },
        )
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
    InvalidTimezone(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
            ConfigError::InvalidTimezone(e) => write!(f, "Invalid timezone alias: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

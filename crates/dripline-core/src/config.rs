//! Dripline configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriplineConfig {
    /// SQLite database path for the reference store.
    #[serde(default = "default_db_path")]
    pub db_path: String,
    #[serde(default)]
    pub executor: ExecutorConfig,
    #[serde(default)]
    pub channel: ChannelConfig,
}

fn default_db_path() -> String {
    "~/.dripline/dripline.db".into()
}

impl Default for DriplineConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            executor: ExecutorConfig::default(),
            channel: ChannelConfig::default(),
        }
    }
}

impl DriplineConfig {
    /// Load config from the default path (~/.dripline/config.toml), falling
    /// back to defaults when the file does not exist.
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::error::DriplineError::Config(format!("Failed to read config: {e}"))
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| {
            crate::error::DriplineError::Config(format!("Failed to parse config: {e}"))
        })?;
        Ok(config)
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the Dripline home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".dripline")
    }
}

/// Due-entry executor settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Page size per due-batch invocation.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Harness tick interval in seconds (`dripline run`).
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,
    /// Defer dispatch of entries outside their active-hours window.
    #[serde(default = "bool_true")]
    pub enforce_active_hours: bool,
}

fn default_page_size() -> usize { 50 }
fn default_tick_secs() -> u64 { 60 }
fn bool_true() -> bool { true }

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            tick_secs: default_tick_secs(),
            enforce_active_hours: bool_true(),
        }
    }
}

/// Delivery channel selection for the harness binary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// When set, dispatch goes out as HTTP POSTs; otherwise deliveries are
    /// logged to the console.
    #[serde(default)]
    pub webhook: Option<WebhookConfig>,
}

/// Outbound webhook settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub url: String,
    #[serde(default)]
    pub headers: Vec<(String, String)>,
}

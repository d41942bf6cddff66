//! Configuration file handling with TOML support.

use crate::cli::Args;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Application configuration loaded from TOML file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// General settings
    #[serde(default)]
    pub general: GeneralConfig,

    /// File locations
    #[serde(default)]
    pub paths: PathsConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Auto-refresh interval in seconds
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval: f64,

    /// API timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Ticker queried at startup
    #[serde(default = "default_symbol")]
    pub default_symbol: String,

    /// Initial display period (1d, 1w, 1mo, 3mo, 1y)
    #[serde(default = "default_period")]
    pub default_period: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            refresh_interval: default_refresh_interval(),
            timeout: default_timeout(),
            default_symbol: default_symbol(),
            default_period: default_period(),
        }
    }
}

fn default_refresh_interval() -> f64 {
    10.0
}
fn default_timeout() -> u64 {
    10
}
fn default_symbol() -> String {
    "2330".to_string()
}
fn default_period() -> String {
    "1mo".to_string()
}

/// File location settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PathsConfig {
    /// Directory holding favorites, alerts, and logs. Defaults to the
    /// platform data directory.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from file.
    pub fn load(path: &PathBuf) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load configuration from default location or fall back to defaults.
    pub fn load_or_default() -> Self {
        if let Some(path) = Self::default_config_path() {
            if path.exists() {
                match Self::load(&path) {
                    Ok(config) => return config,
                    Err(e) => {
                        eprintln!("Warning: Failed to load config: {}", e);
                    }
                }
            }
        }
        Config::default()
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("tickerdash").join("config.toml"))
    }
}

/// Resolve the directory where favorites, alerts, and logs live: CLI flag
/// first, then config, then the platform data directory, then the working
/// directory.
pub fn resolve_data_dir(args: &Args, config: &Config) -> PathBuf {
    args.data_dir
        .clone()
        .or_else(|| config.paths.data_dir.clone())
        .or_else(|| dirs::data_dir().map(|p| p.join("tickerdash")))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Generate a sample configuration file content.
pub fn sample_config() -> &'static str {
    r##"# Tickerdash Configuration File
# A terminal dashboard for a single equity's price trend and volume

[general]
# Auto-refresh interval in seconds
refresh_interval = 10.0
# API timeout in seconds
timeout = 10
# Ticker queried at startup (numeric codes resolve to .TW/.TWO)
default_symbol = "2330"
# Initial display period: 1d, 1w, 1mo, 3mo, 1y
default_period = "1mo"

[paths]
# Where favorites.json, price_alerts.json, and logs live.
# Defaults to the platform data directory.
# data_dir = "/home/user/.local/share/tickerdash"
"##
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.general.refresh_interval, 10.0);
        assert_eq!(config.general.timeout, 10);
        assert_eq!(config.general.default_symbol, "2330");
        assert_eq!(config.general.default_period, "1mo");
        assert!(config.paths.data_dir.is_none());
    }

    #[test]
    fn test_sample_config_parses() {
        let config: Config = toml::from_str(sample_config()).unwrap();
        assert_eq!(config.general.default_symbol, "2330");
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: Config = toml::from_str("[general]\nrefresh_interval = 30.0\n").unwrap();
        assert_eq!(config.general.refresh_interval, 30.0);
        assert_eq!(config.general.default_period, "1mo");
    }
}

//! Configuration management
//!
//! Handles TOML configuration parsing, validation, and atomic saves

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constants::{
    APP_NAME, CONFIG_FILE_NAME, DEFAULT_HOSTS, DEFAULT_MAX_CONCURRENT_PROBES, DEFAULT_POLLING_INTERVAL,
    DEFAULT_PROBE_TIMEOUT, DEFAULT_STRATUM_URLS,
};
use crate::models::PollingConfiguration;

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MonitorConfiguration {
    pub polling: PollingSettings,
    pub targets: TargetSettings,
    pub export: ExportSettings,
}

/// Scheduler timing settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingSettings {
    /// Pause between cycles in seconds (0.1-300.0)
    pub interval: f64,
    /// Per-probe connect timeout in seconds (0.1-60.0)
    pub probe_timeout: f64,
    /// Probes in flight at once within a cycle (1-256)
    pub max_concurrent_probes: usize,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLLING_INTERVAL,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            max_concurrent_probes: DEFAULT_MAX_CONCURRENT_PROBES,
        }
    }
}

/// Watch-lists loaded at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetSettings {
    /// Stratum relay URLs (`stratum+tcp://host:port`)
    pub stratum: Vec<String>,
    /// Host targets (`host[:port]`)
    pub hosts: Vec<String>,
}

impl Default for TargetSettings {
    fn default() -> Self {
        Self {
            stratum: DEFAULT_STRATUM_URLS.iter().map(|s| s.to_string()).collect(),
            hosts: DEFAULT_HOSTS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Where history is written when the monitor exits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ExportSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

impl MonitorConfiguration {
    /// Default per-user config location, e.g. `~/.config/stratum-watch/config.toml`
    pub fn default_config_path() -> Result<PathBuf> {
        let base = dirs::config_dir().context("Could not determine the user configuration directory")?;
        Ok(base.join(APP_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load and validate a configuration file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        Ok(config)
    }

    /// Load the file at the default location if it exists, defaults otherwise
    pub fn load_or_default() -> Result<Self> {
        match Self::default_config_path() {
            Ok(path) if path.exists() => Self::load_from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Write the configuration atomically: temp file in the same directory, then rename
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        self.validate()?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;
        let temp_path = path.with_extension("toml.tmp");
        std::fs::write(&temp_path, content)
            .with_context(|| format!("Failed to write config file: {}", temp_path.display()))?;
        std::fs::rename(&temp_path, path)
            .with_context(|| format!("Failed to replace config file: {}", path.display()))?;
        Ok(())
    }

    /// Check bounds on every numeric setting
    pub fn validate(&self) -> Result<()> {
        self.polling_configuration()?;
        Ok(())
    }

    /// Scheduler settings derived from the `[polling]` section
    pub fn polling_configuration(&self) -> Result<PollingConfiguration> {
        let polling = &self.polling;
        Ok(PollingConfiguration::new(
            polling.interval,
            polling.probe_timeout,
            polling.max_concurrent_probes,
        )?)
    }
}

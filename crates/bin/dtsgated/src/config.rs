//! Configuration loading: TOML file with environment variable overrides.
//!
//! Reads the file named by `DTSGATE_CONFIG`, `dtsgate.toml` by default.
//! Every field has a default so the file is optional. `DTSGATE_LOG` then
//! `RUST_LOG` override the log filter.

use std::collections::HashSet;
use std::time::Duration;

use dtsgate_adapter_relay_http::RelayConfig;
use dtsgate_adapter_simulated::SimulatorConfig;
use dtsgate_app::controller::DtsConfig;
use dtsgate_app::device_manager::ManagerConfig;
use serde::Deserialize;

/// Path used when `DTSGATE_CONFIG` is not set.
pub const DEFAULT_PATH: &str = "dtsgate.toml";

/// Top-level configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    /// Device manager settings.
    pub manager: ManagerConfig,
    /// Zone table and notification generation, shared by every DTS device.
    pub simulator: SimulatorConfig,
    /// One entry per DTS host.
    pub dts: Vec<DtsConfig>,
    /// One entry per relay board.
    pub relay: Vec<RelayConfig>,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
    /// Period of the device status report; `0` disables it.
    pub status_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            manager: ManagerConfig::default(),
            simulator: SimulatorConfig::default(),
            dts: vec![DtsConfig::default()],
            relay: Vec::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "dtsgated=info,dtsgate=info".to_string(),
            status_interval_secs: 30,
        }
    }
}

impl LoggingConfig {
    #[must_use]
    pub fn status_interval(&self) -> Option<Duration> {
        (self.status_interval_secs > 0).then(|| Duration::from_secs(self.status_interval_secs))
    }
}

impl Config {
    /// Load configuration from `DTSGATE_CONFIG` or `dtsgate.toml` (if
    /// present) then apply environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but is malformed, or if the
    /// result does not validate.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("DTSGATE_CONFIG").unwrap_or_else(|_| DEFAULT_PATH.to_string());
        let mut config = Self::from_file(&path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("DTSGATE_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] on the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut ids = HashSet::new();
        for dts in &self.dts {
            if dts.host.trim().is_empty() {
                return Err(ConfigError::Validation("dts host must not be empty".to_string()));
            }
            if dts.channel_num == 0 {
                return Err(ConfigError::Validation(format!(
                    "dts {} must have at least one channel",
                    dts.host
                )));
            }
            if !ids.insert(dts.device_key()) {
                return Err(ConfigError::Validation(format!(
                    "dts host {} configured twice",
                    dts.host
                )));
            }
        }
        for relay in &self.relay {
            if relay.tag.len() != 1 || !relay.tag.chars().all(|c| c.is_ascii_uppercase()) {
                return Err(ConfigError::Validation(format!(
                    "relay tag {:?} must be a single uppercase letter",
                    relay.tag
                )));
            }
            if relay.url.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "relay {} has no url",
                    relay.tag
                )));
            }
            if !ids.insert(relay.device_id()) {
                return Err(ConfigError::Validation(format!(
                    "relay tag {} configured twice",
                    relay.tag
                )));
            }
        }
        if self.simulator.zones_per_channel == 0 {
            return Err(ConfigError::Validation(
                "simulator needs at least one zone per channel".to_string(),
            ));
        }
        Ok(())
    }

    /// Simulator settings for one DTS device.
    #[must_use]
    pub fn simulator_for(&self, dts: &DtsConfig) -> SimulatorConfig {
        SimulatorConfig {
            device_id: dts.device_id,
            channel_num: dts.channel_num,
            ..self.simulator.clone()
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}

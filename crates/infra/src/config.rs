//! Runtime configuration for the stock service.
//!
//! Sources, later ones winning:
//! 1. built-in defaults
//! 2. `config/fiberstock.toml` (optional)
//! 3. environment variables `FIBERSTOCK__<FIELD>`

use std::time::Duration;

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

pub const CONFIG_FILE: &str = "config/fiberstock";
pub const ENV_PREFIX: &str = "FIBERSTOCK";

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ConfigError),

    #[error("invalid configuration: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StockConfig {
    /// Emit low/out-of-stock events after stock-changing writes.
    pub low_stock_alerts: bool,
    /// Prefix for generated count references (`<prefix>-<n>`).
    pub count_reference_prefix: String,
    /// How often the notification worker checks for shutdown while idle.
    pub worker_poll_interval_ms: u64,
    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for StockConfig {
    fn default() -> Self {
        Self {
            low_stock_alerts: true,
            count_reference_prefix: "COUNT".to_string(),
            worker_poll_interval_ms: 250,
            log_filter: "info".to_string(),
        }
    }
}

impl StockConfig {
    /// Load from the default file location and environment.
    pub fn load() -> Result<Self, ConfigLoadError> {
        let config = Self::builder()?
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;
        let loaded = Self::finish(config)?;
        info!(
            low_stock_alerts = loaded.low_stock_alerts,
            count_reference_prefix = %loaded.count_reference_prefix,
            "configuration loaded"
        );
        Ok(loaded)
    }

    /// Load from an in-memory TOML document layered over the defaults.
    pub fn from_toml(source: &str) -> Result<Self, ConfigLoadError> {
        let config = Self::builder()?
            .add_source(File::from_str(source, FileFormat::Toml))
            .build()?;
        Self::finish(config)
    }

    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        let defaults = Self::default();
        Config::builder()
            .set_default("low_stock_alerts", defaults.low_stock_alerts)?
            .set_default("count_reference_prefix", defaults.count_reference_prefix)?
            .set_default("worker_poll_interval_ms", defaults.worker_poll_interval_ms)?
            .set_default("log_filter", defaults.log_filter)
    }

    fn finish(config: Config) -> Result<Self, ConfigLoadError> {
        let loaded: Self = config.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.count_reference_prefix.trim().is_empty() {
            return Err(ConfigLoadError::Validation(
                "count_reference_prefix cannot be empty".to_string(),
            ));
        }
        if self.worker_poll_interval_ms == 0 {
            return Err(ConfigLoadError::Validation(
                "worker_poll_interval_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn worker_poll_interval(&self) -> Duration {
        Duration::from_millis(self.worker_poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        assert_eq!(StockConfig::from_toml("").unwrap(), StockConfig::default());
    }

    #[test]
    fn file_values_override_defaults() {
        let config = StockConfig::from_toml(
            r#"
            low_stock_alerts = false
            count_reference_prefix = "STK"
            "#,
        )
        .unwrap();

        assert!(!config.low_stock_alerts);
        assert_eq!(config.count_reference_prefix, "STK");
        assert_eq!(config.worker_poll_interval(), Duration::from_millis(250));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = StockConfig::from_toml("worker_poll_interval_ms = 0").unwrap_err();
        assert!(matches!(err, ConfigLoadError::Validation(_)));

        let err = StockConfig::from_toml("count_reference_prefix = \" \"").unwrap_err();
        assert!(matches!(err, ConfigLoadError::Validation(_)));
    }
}

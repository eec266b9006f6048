// src/config.rs
//! Service configuration.
//!
//! Values are layered, later sources winning:
//! 1. Built-in defaults
//! 2. Optional `reclaim.toml` (or the file passed to [`ReclaimConfig::load`])
//! 3. Environment variables prefixed `RECLAIM_`, e.g.
//!    `RECLAIM_TICKET_REFRESH_INTERVAL=7200`
//!
//! Durations are given in seconds.

use crate::errors::{Result, TicketError};
use ::config::{Config, ConfigError, Environment, File};
use std::time::Duration;

/// Default config file name, looked up relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "reclaim";

/// Expiration given to attribute references and ticket records when unset.
pub const DEFAULT_TICKET_REFRESH_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Consume watchdog when unset.
pub const DEFAULT_CONSUME_TIMEOUT: Duration = Duration::from_secs(3 * 60);

/// Configuration shared by all ticket operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReclaimConfig {
    /// Relative expiration of the records in a ticket's record set
    pub ticket_refresh_interval: Duration,
    /// How long consume waits for attribute lookups before giving up
    pub consume_timeout: Duration,
}

impl Default for ReclaimConfig {
    fn default() -> Self {
        ReclaimConfig {
            ticket_refresh_interval: DEFAULT_TICKET_REFRESH_INTERVAL,
            consume_timeout: DEFAULT_CONSUME_TIMEOUT,
        }
    }
}

impl ReclaimConfig {
    /// Loads configuration from the optional file and the environment.
    ///
    /// # Arguments
    /// * `path` - Config file name without extension; `None` uses `reclaim`
    ///
    /// # Errors
    /// Returns `TicketError::Config` if a source cannot be read or a value is
    /// present but malformed. Missing values fall back to the defaults.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::with_name(path.unwrap_or(DEFAULT_CONFIG_FILE)).required(false))
            .add_source(Environment::with_prefix("RECLAIM"))
            .build()
            .map_err(|e| TicketError::Config(e.to_string()))?;
        Self::from_settings(&settings)
    }

    /// Reads the known keys out of an already-built `Config`.
    pub fn from_settings(settings: &Config) -> Result<Self> {
        let config = ReclaimConfig {
            ticket_refresh_interval: seconds(
                settings,
                "ticket_refresh_interval",
                DEFAULT_TICKET_REFRESH_INTERVAL,
            )?,
            consume_timeout: seconds(settings, "consume_timeout", DEFAULT_CONSUME_TIMEOUT)?,
        };
        if config.consume_timeout.is_zero() {
            return Err(TicketError::Config("consume_timeout must be positive".to_string()));
        }
        Ok(config)
    }
}

fn seconds(settings: &Config, key: &str, default: Duration) -> Result<Duration> {
    match settings.get::<u64>(key) {
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(ConfigError::NotFound(_)) => Ok(default),
        Err(e) => Err(TicketError::Config(format!("{}: {}", key, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_unset() {
        let settings = Config::builder().build().unwrap();
        let config = ReclaimConfig::from_settings(&settings).unwrap();
        assert_eq!(config, ReclaimConfig::default());
        assert_eq!(config.ticket_refresh_interval, Duration::from_secs(3600));
        assert_eq!(config.consume_timeout, Duration::from_secs(180));
    }

    #[test]
    fn test_overrides() {
        let settings = Config::builder()
            .set_override("ticket_refresh_interval", 60)
            .unwrap()
            .set_override("consume_timeout", 5)
            .unwrap()
            .build()
            .unwrap();
        let config = ReclaimConfig::from_settings(&settings).unwrap();
        assert_eq!(config.ticket_refresh_interval, Duration::from_secs(60));
        assert_eq!(config.consume_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_malformed_value_is_error() {
        let settings = Config::builder()
            .set_override("ticket_refresh_interval", "soon")
            .unwrap()
            .build()
            .unwrap();
        assert!(matches!(
            ReclaimConfig::from_settings(&settings),
            Err(TicketError::Config(_))
        ));
    }

    #[test]
    fn test_zero_consume_timeout_rejected() {
        let settings = Config::builder()
            .set_override("consume_timeout", 0)
            .unwrap()
            .build()
            .unwrap();
        assert!(ReclaimConfig::from_settings(&settings).is_err());
    }
}

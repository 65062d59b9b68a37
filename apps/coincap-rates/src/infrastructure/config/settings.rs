//! Feed Settings
//!
//! Configuration for the rate client, loaded from environment variables.

use std::time::Duration;

use crate::application::services::rates::RateClientConfig;

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable held a value that did not parse.
    #[error("invalid value for {var}: {value}")]
    InvalidValue {
        /// The variable name.
        var: String,
        /// The raw value found.
        value: String,
    },
}

/// Settings for one feed client.
#[derive(Debug, Clone)]
pub struct FeedSettings {
    /// Base URL of the REST API.
    pub rest_url: String,
    /// Base URL of the push WebSocket.
    pub ws_url: String,
    /// How often the asset list is polled.
    pub poll_interval: Duration,
    /// Maximum price age before lookups fail as stale.
    pub staleness_threshold: Duration,
    /// Flat delay between socket reconnect attempts.
    pub reconnect_delay: Duration,
    /// Currency all prices are denominated in.
    pub reference_currency: String,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            rest_url: "https://api.coincap.io/v2".to_string(),
            ws_url: "wss://ws.coincap.io".to_string(),
            poll_interval: Duration::from_secs(20),
            staleness_threshold: Duration::from_secs(30),
            reconnect_delay: Duration::from_secs(5),
            reference_currency: "USD".to_string(),
        }
    }
}

impl FeedSettings {
    /// Load settings from environment variables, falling back to defaults.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `COINCAP_API_URL` | `https://api.coincap.io/v2` |
    /// | `COINCAP_WS_URL` | `wss://ws.coincap.io` |
    /// | `RATES_POLL_INTERVAL_SECS` | `20` |
    /// | `RATES_STALENESS_SECS` | `30` |
    /// | `RATES_RECONNECT_DELAY_SECS` | `5` |
    /// | `RATES_REFERENCE_CURRENCY` | `USD` |
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidValue`] when a duration variable is present but
    /// not a whole number of seconds.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            rest_url: env_or("COINCAP_API_URL", &defaults.rest_url),
            ws_url: env_or("COINCAP_WS_URL", &defaults.ws_url),
            poll_interval: env_secs_or("RATES_POLL_INTERVAL_SECS", defaults.poll_interval)?,
            staleness_threshold: env_secs_or("RATES_STALENESS_SECS", defaults.staleness_threshold)?,
            reconnect_delay: env_secs_or("RATES_RECONNECT_DELAY_SECS", defaults.reconnect_delay)?,
            reference_currency: env_or("RATES_REFERENCE_CURRENCY", &defaults.reference_currency),
        })
    }

    /// The tunables the rate client consumes.
    #[must_use]
    pub fn client_config(&self) -> RateClientConfig {
        RateClientConfig {
            poll_interval: self.poll_interval,
            staleness_threshold: self.staleness_threshold,
            reconnect_delay: self.reconnect_delay,
            reference_currency: self.reference_currency.clone(),
        }
    }
}

fn env_or(var: &str, default: &str) -> String {
    std::env::var(var).unwrap_or_else(|_| default.to_string())
}

fn env_secs_or(var: &str, default: Duration) -> Result<Duration, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => parse_secs(var, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_secs(var: &str, raw: &str) -> Result<Duration, ConfigError> {
    raw.parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| ConfigError::InvalidValue {
            var: var.to_string(),
            value: raw.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_values() {
        let settings = FeedSettings::default();
        assert_eq!(settings.poll_interval, Duration::from_secs(20));
        assert_eq!(settings.staleness_threshold, Duration::from_secs(30));
        assert_eq!(settings.reconnect_delay, Duration::from_secs(5));
        assert_eq!(settings.reference_currency, "USD");
    }

    #[test]
    fn client_config_carries_tunables() {
        let settings = FeedSettings::default();
        let config = settings.client_config();
        assert_eq!(config.poll_interval, settings.poll_interval);
        assert_eq!(config.staleness_threshold, settings.staleness_threshold);
        assert_eq!(config.reconnect_delay, settings.reconnect_delay);
        assert_eq!(config.reference_currency, settings.reference_currency);
    }

    #[test]
    fn duration_values_parse_as_whole_seconds() {
        assert_eq!(
            parse_secs("RATES_POLL_INTERVAL_SECS", "45"),
            Ok(Duration::from_secs(45))
        );
    }

    #[test]
    fn bad_duration_value_is_rejected() {
        assert_eq!(
            parse_secs("RATES_POLL_INTERVAL_SECS", "twenty"),
            Err(ConfigError::InvalidValue {
                var: "RATES_POLL_INTERVAL_SECS".to_string(),
                value: "twenty".to_string(),
            })
        );
    }
}

//! Provider-side settings for polling and tracing.
//!
//! Loaded from an optional TOML file, then overridden from the environment:
//!
//! | Variable | Field |
//! |---|---|
//! | `FORTISASE_POLL_MAX_ATTEMPTS` | `polling.max_attempts`, `delete_polling.max_attempts` |
//! | `FORTISASE_POLL_INTERVAL_SECS` | `polling.interval_secs`, `delete_polling.interval_secs` |
//! | `FORTISASE_LOG_FORMAT` | `tracing.format` |

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::poll::{DEFAULT_INTERVAL, DEFAULT_MAX_ATTEMPTS, PollPolicy};
use crate::telemetry::{Level, TracingConfig, TracingFormat};

/// Environment override for the polling attempt budget.
pub const ENV_POLL_MAX_ATTEMPTS: &str = "FORTISASE_POLL_MAX_ATTEMPTS";
/// Environment override for the polling interval, in seconds.
pub const ENV_POLL_INTERVAL_SECS: &str = "FORTISASE_POLL_INTERVAL_SECS";
/// Environment override for the log format.
pub const ENV_LOG_FORMAT: &str = "FORTISASE_LOG_FORMAT";

/// Top-level provider settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyConfig {
    /// Status polling after create and update
    #[serde(default)]
    pub polling: PollingConfig,

    /// Existence polling after delete
    #[serde(default)]
    pub delete_polling: PollingConfig,

    /// Tracing output
    #[serde(default)]
    pub tracing: TracingSettings,
}

/// Attempt budget and fixed delay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Maximum number of polls
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay between polls in seconds
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            interval_secs: default_interval_secs(),
        }
    }
}

impl PollingConfig {
    /// Converts to a [`PollPolicy`].
    #[must_use]
    pub const fn policy(&self) -> PollPolicy {
        PollPolicy::new(self.max_attempts, Duration::from_secs(self.interval_secs))
    }
}

/// Serializable tracing settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TracingSettings {
    /// Output format
    #[serde(default)]
    pub format: TracingFormat,

    /// Default level (`trace` through `error`)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Explicit filter directives
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

impl Default for TracingSettings {
    fn default() -> Self {
        Self {
            format: TracingFormat::default(),
            level: default_log_level(),
            filter: None,
        }
    }
}

impl TracingSettings {
    /// Builds the subscriber configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `level` is not a tracing level.
    pub fn to_tracing_config(&self) -> Result<TracingConfig> {
        let level = self
            .level
            .parse::<Level>()
            .map_err(|e| Error::invalid_config(format!("tracing.level '{}': {e}", self.level)))?;
        Ok(TracingConfig {
            format: self.format,
            level,
            filter: self.filter.clone(),
        })
    }
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_interval_secs() -> u64 {
    DEFAULT_INTERVAL.as_secs()
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl ApplyConfig {
    /// Parses settings from TOML.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] on malformed TOML.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| Error::invalid_config(e.to_string()))
    }

    /// Reads settings from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::invalid_config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&contents)
    }

    /// Loads settings: file (if given), then environment overrides, then
    /// validation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if any step fails.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let config = config.with_env_overrides()?;
        config.validate()?;
        debug!(config = ?config, "Loaded provider settings");
        Ok(config)
    }

    /// Applies `FORTISASE_*` environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if a variable does not parse.
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Some(attempts) = env_parse::<u32>(ENV_POLL_MAX_ATTEMPTS)? {
            self.polling.max_attempts = attempts;
            self.delete_polling.max_attempts = attempts;
        }
        if let Some(secs) = env_parse::<u64>(ENV_POLL_INTERVAL_SECS)? {
            self.polling.interval_secs = secs;
            self.delete_polling.interval_secs = secs;
        }
        if let Some(format) = env_parse::<TracingFormat>(ENV_LOG_FORMAT)? {
            self.tracing.format = format;
        }
        Ok(self)
    }

    /// Rejects settings that could never succeed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] for a zero attempt budget or an
    /// unknown log level.
    pub fn validate(&self) -> Result<()> {
        if self.polling.max_attempts == 0 {
            return Err(Error::invalid_config("polling.max_attempts must be at least 1"));
        }
        if self.delete_polling.max_attempts == 0 {
            return Err(Error::invalid_config(
                "delete_polling.max_attempts must be at least 1",
            ));
        }
        self.tracing.to_tracing_config().map(|_| ())
    }
}

fn env_parse<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| Error::invalid_config(format!("{name}='{raw}': {e}"))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ApplyConfig::default();
        assert_eq!(config.polling.policy(), PollPolicy::default());
        assert_eq!(config.delete_polling.max_attempts, 20);
        assert_eq!(config.tracing.format, TracingFormat::Compact);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ApplyConfig::from_toml_str(
            r#"
            [polling]
            max_attempts = 30

            [tracing]
            format = "json"
            level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.polling.max_attempts, 30);
        assert_eq!(config.polling.interval_secs, 10);
        assert_eq!(config.delete_polling, PollingConfig::default());
        assert_eq!(config.tracing.format, TracingFormat::Json);
        assert_eq!(
            config.tracing.to_tracing_config().unwrap().level,
            Level::DEBUG
        );
    }

    #[test]
    fn test_malformed_toml() {
        assert!(matches!(
            ApplyConfig::from_toml_str("[polling\nmax_attempts = 1"),
            Err(Error::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let config = ApplyConfig::from_toml_str("[delete_polling]\nmax_attempts = 0").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_level_rejected() {
        let config = ApplyConfig::from_toml_str("[tracing]\nlevel = \"loud\"").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        temp_env::with_vars(
            [
                (ENV_POLL_MAX_ATTEMPTS, Some("3")),
                (ENV_POLL_INTERVAL_SECS, Some(" 1 ")),
                (ENV_LOG_FORMAT, Some("pretty")),
            ],
            || {
                let config = ApplyConfig::load(None).unwrap();
                assert_eq!(
                    config.polling.policy(),
                    PollPolicy::new(3, Duration::from_secs(1))
                );
                assert_eq!(config.delete_polling.max_attempts, 3);
                assert_eq!(config.tracing.format, TracingFormat::Pretty);
            },
        );
    }

    #[test]
    fn test_env_override_parse_error() {
        temp_env::with_var(ENV_POLL_MAX_ATTEMPTS, Some("many"), || {
            let err = ApplyConfig::load(None).unwrap_err();
            assert!(err.to_string().contains(ENV_POLL_MAX_ATTEMPTS));
        });
    }

    #[test]
    fn test_env_zero_attempts_fails_validation() {
        temp_env::with_var(ENV_POLL_MAX_ATTEMPTS, Some("0"), || {
            assert!(ApplyConfig::load(None).is_err());
        });
    }

    #[test]
    fn test_no_env_uses_defaults() {
        temp_env::with_vars_unset(
            [ENV_POLL_MAX_ATTEMPTS, ENV_POLL_INTERVAL_SECS, ENV_LOG_FORMAT],
            || {
                assert_eq!(ApplyConfig::load(None).unwrap(), ApplyConfig::default());
            },
        );
    }
}

//! Environment overrides
//!
//! A handful of variables override the file after parsing so deployments can
//! tune the buffer without editing TOML.

use std::str::FromStr;
use std::time::Duration;

use crate::Config;
use crate::error::{ConfigError, Result};
use crate::logging::LogLevel;

pub const BATCH_SIZE: &str = "BATCH_SIZE";
pub const FLUSH_INTERVAL_MS: &str = "FLUSH_INTERVAL_MS";
pub const MAX_RETRIES: &str = "MAX_RETRIES";
pub const PERSIST_TIMEOUT_MS: &str = "PERSIST_TIMEOUT_MS";
pub const LOG_LEVEL: &str = "LOG_LEVEL";
pub const CLICKHOUSE_URL: &str = "CLICKHOUSE_URL";

/// Apply recognized variables from `vars` to `config`
///
/// Unrecognized names are ignored. Empty values are treated as unset.
pub fn apply_overrides<I, K, V>(config: &mut Config, vars: I) -> Result<()>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    for (key, value) in vars {
        let value = value.as_ref().trim();
        if value.is_empty() {
            continue;
        }
        match key.as_ref() {
            BATCH_SIZE => config.buffer.batch_size = parse(BATCH_SIZE, value)?,
            FLUSH_INTERVAL_MS => {
                config.buffer.flush_interval = millis(FLUSH_INTERVAL_MS, value)?;
            }
            MAX_RETRIES => config.buffer.max_retries = parse(MAX_RETRIES, value)?,
            PERSIST_TIMEOUT_MS => {
                config.buffer.persist_timeout = millis(PERSIST_TIMEOUT_MS, value)?;
            }
            LOG_LEVEL => {
                config.log.level = LogLevel::from_str(value)
                    .map_err(|e| ConfigError::invalid_env(LOG_LEVEL, value, e))?;
            }
            CLICKHOUSE_URL => config.storage.clickhouse.url = value.to_string(),
            _ => {}
        }
    }
    Ok(())
}

fn parse<T>(var: &'static str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e: T::Err| ConfigError::invalid_env(var, value, e.to_string()))
}

fn millis(var: &'static str, value: &str) -> Result<Duration> {
    parse::<u64>(var, value).map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_applied() {
        let mut config = Config::default();
        apply_overrides(
            &mut config,
            [
                ("BATCH_SIZE", "25"),
                ("FLUSH_INTERVAL_MS", "1500"),
                ("MAX_RETRIES", "7"),
                ("PERSIST_TIMEOUT_MS", "200"),
                ("LOG_LEVEL", "debug"),
                ("CLICKHOUSE_URL", "http://ch:8123"),
                ("HOME", "/root"),
            ],
        )
        .unwrap();

        assert_eq!(config.buffer.batch_size, 25);
        assert_eq!(config.buffer.flush_interval, Duration::from_millis(1500));
        assert_eq!(config.buffer.max_retries, 7);
        assert_eq!(config.buffer.persist_timeout, Duration::from_millis(200));
        assert_eq!(config.log.level, LogLevel::Debug);
        assert_eq!(config.storage.clickhouse.url, "http://ch:8123");
    }

    #[test]
    fn test_empty_value_ignored() {
        let mut config = Config::default();
        apply_overrides(&mut config, [("BATCH_SIZE", "  ")]).unwrap();
        assert_eq!(config.buffer.batch_size, 1000);
    }

    #[test]
    fn test_invalid_value_rejected() {
        let mut config = Config::default();
        let err = apply_overrides(&mut config, [("MAX_RETRIES", "-1")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { var: "MAX_RETRIES", .. }));

        let err = apply_overrides(&mut config, [("LOG_LEVEL", "loud")]).unwrap_err();
        assert!(err.to_string().contains("LOG_LEVEL"));
    }
}

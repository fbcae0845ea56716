//! Spool Configuration
//!
//! TOML-based configuration loading with sensible defaults.
//! Minimal config should just work - only specify what you need to change.
//!
//! # Parsing
//!
//! Use the `FromStr` trait to parse configuration:
//!
//! ```
//! use spool_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("[buffer]\nbatch_size = 500").unwrap();
//! assert_eq!(config.buffer.batch_size, 500);
//! ```
//!
//! # Example Config
//!
//! ```toml
//! [buffer]
//! batch_size = 1000
//! flush_interval = "60s"
//!
//! [storage]
//! backend = "clickhouse"
//!
//! [storage.clickhouse]
//! url = "http://localhost:8123"
//!
//! [log]
//! level = "info"
//! format = "json"
//! ```
//!
//! # Environment
//!
//! `BATCH_SIZE`, `FLUSH_INTERVAL_MS`, `MAX_RETRIES`, `PERSIST_TIMEOUT_MS`,
//! `LOG_LEVEL` and `CLICKHOUSE_URL` override the file when set.

mod buffer;
mod env;
mod error;
mod logging;
mod storage;
mod validation;

use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use buffer::BufferSection;
pub use error::{ConfigError, Result};
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use storage::{ClickHouseSection, StorageKind, StorageSection};

use serde::Deserialize;

/// Main configuration structure
///
/// All sections are optional with sensible defaults.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Batching, retry and shutdown settings
    pub buffer: BufferSection,

    /// Storage backend selection
    pub storage: StorageSection,

    /// Logging configuration
    pub log: LogConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or contains invalid TOML.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string
    ///
    /// Prefer using the `FromStr` trait implementation.
    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from the process environment, then re-validate
    pub fn with_env(self) -> Result<Self> {
        self.with_env_overrides(std::env::vars())
    }

    /// Apply overrides from `vars`, then re-validate
    pub fn with_env_overrides<I, K, V>(mut self, vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        env::apply_overrides(&mut self, vars)?;
        self.validate()?;
        Ok(self)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.buffer.batch_size, 1000);
        assert_eq!(config.storage.backend, StorageKind::Memory);
        assert_eq!(config.log.level, LogLevel::Info);
    }

    #[test]
    fn test_full_config() {
        let toml = r#"
[buffer]
batch_size = 200
flush_interval = "10s"
max_retries = 5
persist_timeout = "2s"
drain_max_attempts = 4
drain_poll_interval = "50ms"
shutdown_wait = "1s"

[storage]
backend = "clickhouse"

[storage.clickhouse]
url = "http://localhost:8123"
table = "app_logs"

[log]
level = "warn"
format = "json"
"#;
        let config = Config::from_str(toml).unwrap();
        assert_eq!(config.buffer.batch_size, 200);
        assert_eq!(config.buffer.flush_interval, Duration::from_secs(10));
        assert_eq!(config.buffer.max_retries, 5);
        assert_eq!(config.buffer.drain_poll_interval, Duration::from_millis(50));
        assert_eq!(config.storage.backend, StorageKind::Clickhouse);
        assert_eq!(config.storage.clickhouse.table, "app_logs");
        assert_eq!(config.log.format, LogFormat::Json);
    }

    #[test]
    fn test_invalid_toml() {
        let err = Config::from_str("[buffer\nbatch_size = 1").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_validation_runs_on_parse() {
        let err = Config::from_str("[buffer]\nbatch_size = 0").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[buffer]\nmax_retries = 9").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.buffer.max_retries, 9);
    }

    #[test]
    fn test_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::from_file(dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::IoError { .. }));
        assert!(err.to_string().contains("missing.toml"));
    }

    #[test]
    fn test_env_overrides_revalidate() {
        let config = Config::default()
            .with_env_overrides([("BATCH_SIZE", "10")])
            .unwrap();
        assert_eq!(config.buffer.batch_size, 10);

        let err = Config::default()
            .with_env_overrides([("BATCH_SIZE", "0")])
            .unwrap_err();
        assert!(err.to_string().contains("batch_size"));
    }
}

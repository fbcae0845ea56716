//! Buffer configuration
//!
//! Batching, retry and shutdown knobs for the ingestion buffer.

use serde::Deserialize;
use std::time::Duration;

/// Buffer configuration
///
/// # Example
///
/// ```toml
/// [buffer]
/// batch_size = 1000
/// flush_interval = "60s"
/// max_retries = 3
/// persist_timeout = "5s"
/// drain_max_attempts = 10
/// drain_poll_interval = "100ms"
/// shutdown_wait = "5s"
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BufferSection {
    /// Records per batch, and the queue length that triggers a flush
    /// Default: 1000
    pub batch_size: usize,

    /// Flush timer period
    /// Default: 60s
    #[serde(with = "humantime_serde")]
    pub flush_interval: Duration,

    /// Failed attempts a record may be re-queued after before quarantine
    /// Default: 3
    pub max_retries: u32,

    /// Deadline for one bulk insert
    /// Default: 5s
    #[serde(with = "humantime_serde")]
    pub persist_timeout: Duration,

    /// Flush attempts per drain
    /// Default: 10
    pub drain_max_attempts: u32,

    /// Sleep between drain attempts while another flush runs
    /// Default: 100ms
    #[serde(with = "humantime_serde")]
    pub drain_poll_interval: Duration,

    /// How long shutdown waits for an in-progress flush
    /// Default: 5s
    #[serde(with = "humantime_serde")]
    pub shutdown_wait: Duration,
}

impl Default for BufferSection {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            flush_interval: Duration::from_secs(60),
            max_retries: 3,
            persist_timeout: Duration::from_secs(5),
            drain_max_attempts: 10,
            drain_poll_interval: Duration::from_millis(100),
            shutdown_wait: Duration::from_secs(5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_empty() {
        let config: BufferSection = toml::from_str("").unwrap();
        assert_eq!(config, BufferSection::default());
    }

    #[test]
    fn test_deserialize_humantime() {
        let toml = r#"
batch_size = 50
flush_interval = "1m 30s"
persist_timeout = "250ms"
"#;
        let config: BufferSection = toml::from_str(toml).unwrap();
        assert_eq!(config.batch_size, 50);
        assert_eq!(config.flush_interval, Duration::from_secs(90));
        assert_eq!(config.persist_timeout, Duration::from_millis(250));
        assert_eq!(config.max_retries, 3);
    }
}

//! Buffer configuration
//!
//! Runtime knobs for batching, retry, deadline and drain behavior.

use std::time::Duration;

use crate::error::{BufferError, Result};

// =============================================================================
// Constants
// =============================================================================

/// Queue length that triggers a flush, and the maximum batch size
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Period of the flush timer
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(60);

/// Failed attempts a record may be re-queued after before quarantine
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Deadline for a single bulk insert
pub const DEFAULT_PERSIST_TIMEOUT: Duration = Duration::from_secs(5);

/// Flush attempts made by one drain
pub const DEFAULT_DRAIN_MAX_ATTEMPTS: u32 = 10;

/// Sleep between drain attempts while another flush is running
pub const DEFAULT_DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How long shutdown waits for an in-progress flush
pub const DEFAULT_SHUTDOWN_WAIT: Duration = Duration::from_secs(5);

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for [`LogBuffer`](crate::LogBuffer)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferConfig {
    /// Flush threshold and maximum records per batch
    pub batch_size: usize,

    /// Flush timer period
    pub flush_interval: Duration,

    /// Retry budget before quarantine
    pub max_retries: u32,

    /// Deadline for `bulk_insert`
    pub persist_timeout: Duration,

    /// Attempt budget for `force_flush`
    pub drain_max_attempts: u32,

    /// Sleep between drain attempts while a flush is in progress
    pub drain_poll_interval: Duration,

    /// Bounded wait for an in-progress flush during `close`
    pub shutdown_wait: Duration,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            max_retries: DEFAULT_MAX_RETRIES,
            persist_timeout: DEFAULT_PERSIST_TIMEOUT,
            drain_max_attempts: DEFAULT_DRAIN_MAX_ATTEMPTS,
            drain_poll_interval: DEFAULT_DRAIN_POLL_INTERVAL,
            shutdown_wait: DEFAULT_SHUTDOWN_WAIT,
        }
    }
}

impl BufferConfig {
    /// Set the batch size (clamped to at least 1)
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Set the flush interval
    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    /// Set the retry budget
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the insert deadline
    pub fn with_persist_timeout(mut self, timeout: Duration) -> Self {
        self.persist_timeout = timeout;
        self
    }

    /// Set the drain attempt budget
    pub fn with_drain_max_attempts(mut self, attempts: u32) -> Self {
        self.drain_max_attempts = attempts;
        self
    }

    /// Set the drain poll interval
    pub fn with_drain_poll_interval(mut self, interval: Duration) -> Self {
        self.drain_poll_interval = interval;
        self
    }

    /// Set the shutdown wait
    pub fn with_shutdown_wait(mut self, wait: Duration) -> Self {
        self.shutdown_wait = wait;
        self
    }

    /// Reject values the timer and flusher cannot run with
    ///
    /// Fields are public, so builders alone cannot guarantee this.
    pub fn validate(&self) -> Result<()> {
        let invalid = |field: &'static str| -> Result<()> {
            Err(BufferError::InvalidConfig {
                field,
                reason: "must be greater than zero",
            })
        };
        if self.batch_size == 0 {
            return invalid("batch_size");
        }
        if self.flush_interval.is_zero() {
            return invalid("flush_interval");
        }
        if self.persist_timeout.is_zero() {
            return invalid("persist_timeout");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = BufferConfig::default();
        assert_eq!(config.batch_size, 1000);
        assert_eq!(config.flush_interval, Duration::from_millis(60_000));
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.persist_timeout, Duration::from_millis(5000));
        assert_eq!(config.drain_max_attempts, 10);
        assert_eq!(config.drain_poll_interval, Duration::from_millis(100));
    }

    #[test]
    fn test_batch_size_clamped() {
        let config = BufferConfig::default().with_batch_size(0);
        assert_eq!(config.batch_size, 1);
    }

    #[test]
    fn test_validate_rejects_zero_durations() {
        assert!(BufferConfig::default().validate().is_ok());

        let config = BufferConfig::default().with_flush_interval(Duration::ZERO);
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            BufferError::InvalidConfig {
                field: "flush_interval",
                ..
            }
        ));
        assert_eq!(
            err.to_string(),
            "invalid buffer config: flush_interval must be greater than zero"
        );

        let config = BufferConfig::default().with_persist_timeout(Duration::ZERO);
        assert!(matches!(
            config.validate(),
            Err(BufferError::InvalidConfig {
                field: "persist_timeout",
                ..
            })
        ));

        let config = BufferConfig {
            batch_size: 0,
            ..BufferConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(BufferError::InvalidConfig {
                field: "batch_size",
                ..
            })
        ));
    }

    #[test]
    fn test_builders() {
        let config = BufferConfig::default()
            .with_batch_size(2)
            .with_flush_interval(Duration::from_secs(1))
            .with_max_retries(1)
            .with_persist_timeout(Duration::from_millis(250))
            .with_drain_max_attempts(4)
            .with_drain_poll_interval(Duration::from_millis(5))
            .with_shutdown_wait(Duration::from_secs(2));

        assert_eq!(config.batch_size, 2);
        assert_eq!(config.flush_interval, Duration::from_secs(1));
        assert_eq!(config.max_retries, 1);
        assert_eq!(config.persist_timeout, Duration::from_millis(250));
        assert_eq!(config.drain_max_attempts, 4);
        assert_eq!(config.drain_poll_interval, Duration::from_millis(5));
        assert_eq!(config.shutdown_wait, Duration::from_secs(2));
    }
}

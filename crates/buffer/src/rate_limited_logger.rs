//! Rate-limited failure logging
//!
//! A storage outage makes every timer tick fail the same way. This logger emits
//! at most one line per interval and reports how many were swallowed in
//! between.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

/// Default interval between emitted lines
pub const DEFAULT_LOG_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug)]
pub struct RateLimitedLogger {
    min_interval: Duration,
    last_emit: Mutex<Option<Instant>>,
    /// Failures since the last emitted line
    suppressed: AtomicU64,
    total: AtomicU64,
}

impl RateLimitedLogger {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_emit: Mutex::new(None),
            suppressed: AtomicU64::new(0),
            total: AtomicU64::new(0),
        }
    }

    /// Record a failure, logging it at error level unless rate-limited
    ///
    /// Returns true if a line was emitted.
    pub fn error(&self, context: &str, error: &dyn std::fmt::Display) -> bool {
        let total = self.total.fetch_add(1, Ordering::Relaxed) + 1;

        if !self.try_claim_slot() {
            self.suppressed.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        let suppressed = self.suppressed.swap(0, Ordering::Relaxed);
        if suppressed > 0 {
            tracing::error!(
                context = %context,
                error = %error,
                suppressed_count = suppressed,
                total_errors = total,
                "flush failed (rate-limited)"
            );
        } else {
            tracing::error!(
                context = %context,
                error = %error,
                total_errors = total,
                "flush failed"
            );
        }
        true
    }

    fn try_claim_slot(&self) -> bool {
        let mut last = self.last_emit.lock();
        let now = Instant::now();
        match *last {
            Some(prev) if now.duration_since(prev) < self.min_interval => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }

    /// Failures recorded since the last emitted line
    pub fn suppressed_count(&self) -> u64 {
        self.suppressed.load(Ordering::Relaxed)
    }

    /// Failures ever recorded
    pub fn total_count(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }
}

impl Default for RateLimitedLogger {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_first_error_logs() {
        let logger = RateLimitedLogger::default();
        assert!(logger.error("timer", &"boom"));
        assert_eq!(logger.total_count(), 1);
        assert_eq!(logger.suppressed_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_errors_suppressed() {
        let logger = RateLimitedLogger::new(Duration::from_secs(10));
        assert!(logger.error("timer", &"boom"));

        for _ in 0..5 {
            assert!(!logger.error("timer", &"boom"));
        }
        assert_eq!(logger.total_count(), 6);
        assert_eq!(logger.suppressed_count(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_logs_again_after_interval() {
        let logger = RateLimitedLogger::new(Duration::from_secs(10));
        assert!(logger.error("timer", &"boom"));
        assert!(!logger.error("timer", &"boom"));

        tokio::time::advance(Duration::from_secs(11)).await;

        assert!(logger.error("timer", &"boom"));
        assert_eq!(logger.suppressed_count(), 0);
    }
}

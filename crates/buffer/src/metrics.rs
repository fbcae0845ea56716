//! Buffer metrics
//!
//! Atomic counters updated on the flush path and read by `get_stats`.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Sentinel for "never processed" in `last_processed_ms`
const NEVER: i64 = i64::MIN;

// =============================================================================
// Metrics
// =============================================================================

/// Counters for the buffer's lifetime
#[derive(Debug)]
pub struct BufferMetrics {
    /// Records accepted by `add_log`
    pub records_received: AtomicU64,

    /// Records persisted (monotonic)
    pub total_processed: AtomicU64,

    /// Records moved to quarantine
    pub total_failed: AtomicU64,

    /// Batches committed
    pub batches_committed: AtomicU64,

    /// Batches rolled back
    pub batches_rolled_back: AtomicU64,

    /// Records put back on the queue after a failed attempt
    pub records_requeued: AtomicU64,

    /// Partition checks that failed
    pub partition_errors: AtomicU64,

    /// Inserts that lost the race against the deadline
    pub insert_timeouts: AtomicU64,

    /// Batches returned to the queue by a cancelled flush
    pub batches_abandoned: AtomicU64,

    /// Last successful commit, unix millis
    last_processed_ms: AtomicI64,
}

impl BufferMetrics {
    pub const fn new() -> Self {
        Self {
            records_received: AtomicU64::new(0),
            total_processed: AtomicU64::new(0),
            total_failed: AtomicU64::new(0),
            batches_committed: AtomicU64::new(0),
            batches_rolled_back: AtomicU64::new(0),
            records_requeued: AtomicU64::new(0),
            partition_errors: AtomicU64::new(0),
            insert_timeouts: AtomicU64::new(0),
            batches_abandoned: AtomicU64::new(0),
            last_processed_ms: AtomicI64::new(NEVER),
        }
    }

    #[inline]
    pub fn record_received(&self) {
        self.records_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a committed batch
    #[inline]
    pub fn record_committed(&self, count: u64, at: DateTime<Utc>) {
        self.total_processed.fetch_add(count, Ordering::Relaxed);
        self.batches_committed.fetch_add(1, Ordering::Relaxed);
        self.last_processed_ms
            .store(at.timestamp_millis(), Ordering::Relaxed);
    }

    /// Record a rolled-back batch
    #[inline]
    pub fn record_rolled_back(&self, requeued: u64, quarantined: u64) {
        self.batches_rolled_back.fetch_add(1, Ordering::Relaxed);
        self.records_requeued.fetch_add(requeued, Ordering::Relaxed);
        self.total_failed.fetch_add(quarantined, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_partition_error(&self) {
        self.partition_errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_insert_timeout(&self) {
        self.insert_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_abandoned(&self) {
        self.batches_abandoned.fetch_add(1, Ordering::Relaxed);
    }

    /// Time of the last successful commit
    pub fn last_processed_at(&self) -> Option<DateTime<Utc>> {
        match self.last_processed_ms.load(Ordering::Relaxed) {
            NEVER => None,
            ms => DateTime::from_timestamp_millis(ms),
        }
    }

    /// Get snapshot of metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            records_received: self.records_received.load(Ordering::Relaxed),
            total_processed: self.total_processed.load(Ordering::Relaxed),
            total_failed: self.total_failed.load(Ordering::Relaxed),
            batches_committed: self.batches_committed.load(Ordering::Relaxed),
            batches_rolled_back: self.batches_rolled_back.load(Ordering::Relaxed),
            records_requeued: self.records_requeued.load(Ordering::Relaxed),
            partition_errors: self.partition_errors.load(Ordering::Relaxed),
            insert_timeouts: self.insert_timeouts.load(Ordering::Relaxed),
            batches_abandoned: self.batches_abandoned.load(Ordering::Relaxed),
        }
    }
}

impl Default for BufferMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time snapshot of metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub records_received: u64,
    pub total_processed: u64,
    pub total_failed: u64,
    pub batches_committed: u64,
    pub batches_rolled_back: u64,
    pub records_requeued: u64,
    pub partition_errors: u64,
    pub insert_timeouts: u64,
    pub batches_abandoned: u64,
}

impl MetricsSnapshot {
    /// Percentage of finished records that were persisted
    ///
    /// `100.0` when nothing has been persisted or quarantined yet.
    pub fn success_rate(&self) -> f64 {
        let finished = self.total_processed + self.total_failed;
        if finished == 0 {
            return 100.0;
        }
        self.total_processed as f64 / finished as f64 * 100.0
    }
}

// =============================================================================
// Stats
// =============================================================================

/// Operational view returned by `LogBuffer::get_stats`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BufferStats {
    /// Records waiting in the staging queue
    pub buffer_size: usize,
    pub total_processed: u64,
    pub total_failed: u64,
    /// Records claimed by the active flush
    pub pending_count: usize,
    pub permanently_failed_count: usize,
    pub success_rate: f64,
    pub is_processing: bool,
    pub last_processed_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_metrics_are_zero() {
        let metrics = BufferMetrics::new();
        assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
        assert!(metrics.last_processed_at().is_none());
    }

    #[test]
    fn test_record_committed_sets_last_processed() {
        let metrics = BufferMetrics::new();
        let at = DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();

        metrics.record_committed(10, at);
        metrics.record_committed(5, at);

        let s = metrics.snapshot();
        assert_eq!(s.total_processed, 15);
        assert_eq!(s.batches_committed, 2);
        assert_eq!(metrics.last_processed_at(), Some(at));
    }

    #[test]
    fn test_record_rolled_back() {
        let metrics = BufferMetrics::new();
        metrics.record_rolled_back(3, 1);

        let s = metrics.snapshot();
        assert_eq!(s.batches_rolled_back, 1);
        assert_eq!(s.records_requeued, 3);
        assert_eq!(s.total_failed, 1);
    }

    #[test]
    fn test_success_rate() {
        let mut s = MetricsSnapshot::default();
        assert_eq!(s.success_rate(), 100.0);

        s.total_processed = 3;
        s.total_failed = 1;
        assert_eq!(s.success_rate(), 75.0);

        s.total_processed = 0;
        assert_eq!(s.success_rate(), 0.0);
    }
}

//! Batch flusher
//!
//! Single-flight consumer of the staging queue. One call walks the state
//! machine
//!
//! ```text
//! Idle → Claiming → PartitionCheck → Persisting → Committing  → Idle
//!                         │               │
//!                         └───────────────┴──→ RollingBack → Idle
//! ```
//!
//! Claiming removes the batch from the queue before any I/O. On failure every
//! record is either re-queued at the tail with `retry_count + 1` or moved to
//! quarantine once its budget is spent. A flush whose future is dropped
//! mid-await returns its batch to the head of the queue.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::backend::StorageError;
use crate::buffer::Shared;
use crate::error::{BufferError, Result};
use crate::record::{BatchId, Record};

// =============================================================================
// Phase
// =============================================================================

/// Where the flusher currently is in its state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum FlushPhase {
    Idle = 0,
    Claiming = 1,
    PartitionCheck = 2,
    Persisting = 3,
    Committing = 4,
    RollingBack = 5,
}

impl FlushPhase {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Claiming,
            2 => Self::PartitionCheck,
            3 => Self::Persisting,
            4 => Self::Committing,
            5 => Self::RollingBack,
            _ => Self::Idle,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Claiming => "claiming",
            Self::PartitionCheck => "partition_check",
            Self::Persisting => "persisting",
            Self::Committing => "committing",
            Self::RollingBack => "rolling_back",
        }
    }
}

impl fmt::Display for FlushPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Outcome
// =============================================================================

/// Why a flush call did nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Another flush holds the single-flight flag
    Busy,
    /// Nothing staged
    Empty,
}

/// Result of one flush call
#[derive(Debug, Clone, PartialEq)]
pub enum FlushOutcome {
    /// No batch was claimed
    Skipped(SkipReason),

    /// Batch persisted
    Committed { batch_id: BatchId, count: usize },

    /// Batch failed; records were re-queued or quarantined
    RolledBack {
        batch_id: BatchId,
        requeued: usize,
        quarantined: usize,
        reason: String,
    },
}

impl FlushOutcome {
    /// Records persisted by this call
    pub fn committed_count(&self) -> usize {
        match self {
            Self::Committed { count, .. } => *count,
            _ => 0,
        }
    }
}

// =============================================================================
// Single-flight guard
// =============================================================================

/// Holds the single-flight flag; releasing it resets the phase to idle
struct FlightGuard<'a> {
    processing: &'a AtomicBool,
    phase: &'a AtomicU8,
}

impl<'a> FlightGuard<'a> {
    fn try_acquire(processing: &'a AtomicBool, phase: &'a AtomicU8) -> Option<Self> {
        processing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { processing, phase })
    }

    fn enter(&self, phase: FlushPhase) {
        self.phase.store(phase as u8, Ordering::Release);
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.phase.store(FlushPhase::Idle as u8, Ordering::Release);
        self.processing.store(false, Ordering::Release);
    }
}

// =============================================================================
// Claimed batch
// =============================================================================

/// Records taken off the queue by the active flush
///
/// A batch dropped before it reached an outcome (the flush future was
/// cancelled mid-await) goes back to the head of the queue in its original
/// order with retry counts untouched.
pub(crate) struct ClaimedBatch<'a> {
    shared: &'a Shared,
    batch_id: BatchId,
    records: Vec<Record>,
}

impl ClaimedBatch<'_> {
    pub(crate) fn records(&self) -> &[Record] {
        &self.records
    }

    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Hand the records to commit or rollback; the guard is disarmed
    pub(crate) fn settle(mut self) -> Vec<Record> {
        std::mem::take(&mut self.records)
    }
}

impl Drop for ClaimedBatch<'_> {
    fn drop(&mut self) {
        if self.records.is_empty() {
            return;
        }
        let records = std::mem::take(&mut self.records);
        let count = records.len();
        self.shared.queue.with_locked(|queue| {
            self.shared
                .ledger
                .release_in_flight(records.iter().map(|r| &r.id));
            for record in records.into_iter().rev() {
                queue.push_front(record);
            }
        });
        self.shared.metrics.record_abandoned();
        warn!(
            batch_id = %self.batch_id,
            count,
            "flush abandoned before an outcome, batch returned to queue"
        );
    }
}

// =============================================================================
// Flush
// =============================================================================

impl Shared {
    pub(crate) fn phase(&self) -> FlushPhase {
        FlushPhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    pub(crate) fn is_processing(&self) -> bool {
        self.processing.load(Ordering::Acquire)
    }

    /// Run one flush attempt
    ///
    /// Returns immediately when another flush is active or the queue is empty.
    /// Insert failures and deadline expiry are absorbed (retry/quarantine);
    /// a partition failure rolls the batch back and is returned as an error.
    pub(crate) async fn flush(&self) -> Result<FlushOutcome> {
        if self.queue.is_empty() {
            return Ok(FlushOutcome::Skipped(SkipReason::Empty));
        }
        let Some(guard) = FlightGuard::try_acquire(&self.processing, &self.phase) else {
            return Ok(FlushOutcome::Skipped(SkipReason::Busy));
        };

        guard.enter(FlushPhase::Claiming);
        let batch_id = BatchId::new();
        let started_at = Utc::now();
        let batch = self.claim(batch_id, started_at);
        if batch.is_empty() {
            // Queue was cleared between the emptiness check and the claim
            return Ok(FlushOutcome::Skipped(SkipReason::Empty));
        }
        debug!(batch_id = %batch_id, count = batch.len(), "claimed batch");

        guard.enter(FlushPhase::PartitionCheck);
        if let Err(e) = self.check_partition(started_at).await {
            self.metrics.record_partition_error();
            guard.enter(FlushPhase::RollingBack);
            let reason = e.to_string();
            self.roll_back(batch.settle(), batch_id, &reason);
            return Err(BufferError::Partition {
                batch_id,
                source: e,
            });
        }

        guard.enter(FlushPhase::Persisting);
        let persisted = self.persist(batch.records()).await;
        match persisted {
            Ok(()) => {
                guard.enter(FlushPhase::Committing);
                let records = batch.settle();
                self.commit(&records, batch_id);
                Ok(FlushOutcome::Committed {
                    batch_id,
                    count: records.len(),
                })
            }
            Err(e) => {
                guard.enter(FlushPhase::RollingBack);
                let reason = e.to_string();
                let (requeued, quarantined) = self.roll_back(batch.settle(), batch_id, &reason);
                Ok(FlushOutcome::RolledBack {
                    batch_id,
                    requeued,
                    quarantined,
                    reason,
                })
            }
        }
    }

    /// Pop up to `batch_size` records and mark them in flight, atomically
    pub(crate) fn claim(&self, batch_id: BatchId, started_at: DateTime<Utc>) -> ClaimedBatch<'_> {
        let batch_size = self.config.batch_size;
        let records = self.queue.with_locked(|queue| {
            let n = batch_size.min(queue.len());
            let records: Vec<Record> = queue.drain(..n).collect();
            self.ledger.track_in_flight(&records, batch_id, started_at);
            records
        });
        ClaimedBatch {
            shared: self,
            batch_id,
            records,
        }
    }

    /// Partition readiness under the same deadline as the insert
    async fn check_partition(&self, for_date: DateTime<Utc>) -> std::result::Result<(), StorageError> {
        let deadline = self.config.persist_timeout;
        match tokio::time::timeout(deadline, self.backend.ensure_partition(for_date)).await {
            Ok(result) => result,
            Err(_) => Err(StorageError::Timeout {
                backend: self.backend.name(),
                operation: "partition check",
                millis: deadline.as_millis(),
            }),
        }
    }

    /// Bulk insert raced against the persistence deadline
    ///
    /// On expiry the insert future is dropped; whatever the backend eventually
    /// does with it is ignored.
    async fn persist(&self, batch: &[Record]) -> std::result::Result<(), StorageError> {
        let deadline = self.config.persist_timeout;
        match tokio::time::timeout(deadline, self.backend.bulk_insert(batch)).await {
            Ok(result) => result,
            Err(_) => {
                self.metrics.record_insert_timeout();
                Err(StorageError::Timeout {
                    backend: self.backend.name(),
                    operation: "insert",
                    millis: deadline.as_millis(),
                })
            }
        }
    }

    fn commit(&self, batch: &[Record], batch_id: BatchId) {
        let now = Utc::now();
        self.ledger.release_in_flight(batch.iter().map(|r| &r.id));
        self.metrics.record_committed(batch.len() as u64, now);
        info!(
            batch_id = %batch_id,
            count = batch.len(),
            backend = self.backend.name(),
            remaining = self.queue.len(),
            "flushed batch"
        );
    }

    /// Re-queue or quarantine every record of a failed batch
    ///
    /// Returns `(requeued, quarantined)`.
    fn roll_back(&self, batch: Vec<Record>, batch_id: BatchId, reason: &str) -> (usize, usize) {
        let now = Utc::now();
        let max_retries = self.config.max_retries;
        let count = batch.len();

        let (requeued, quarantined) = self.queue.with_locked(|queue| {
            self.ledger.release_in_flight(batch.iter().map(|r| &r.id));

            let mut requeued = 0;
            let mut quarantined = 0;
            for mut record in batch {
                if record.retry_count < max_retries {
                    record.record_failure(reason, now);
                    queue.push_back(record);
                    requeued += 1;
                } else {
                    warn!(
                        record_id = %record.id,
                        batch_id = %batch_id,
                        retry_count = record.retry_count,
                        reason = %reason,
                        "record exhausted retries, quarantined"
                    );
                    self.ledger.quarantine(record, reason, batch_id, now);
                    quarantined += 1;
                }
            }
            (requeued, quarantined)
        });

        self.metrics
            .record_rolled_back(requeued as u64, quarantined as u64);
        warn!(
            batch_id = %batch_id,
            count,
            requeued,
            quarantined,
            reason = %reason,
            "batch flush failed"
        );
        (requeued, quarantined)
    }
}

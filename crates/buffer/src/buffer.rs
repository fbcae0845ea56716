//! Log buffer
//!
//! [`LogBuffer`] is the handle the ingestion layer talks to. It owns the staging
//! queue, the failure ledger, the metrics and the flush timer, and forwards
//! flushes to the storage backend it was built with.
//!
//! The buffer is constructed explicitly by the process's composition root.
//! Nothing runs until [`LogBuffer::open`] starts the timer, and
//! [`LogBuffer::close`] drains and stops it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8};

use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::backend::StorageBackend;
use crate::config::BufferConfig;
use crate::drain::DrainReport;
use crate::error::{BufferError, Result};
use crate::flusher::{FlushOutcome, FlushPhase};
use crate::ledger::FailureLedger;
use crate::metrics::{BufferMetrics, BufferStats, MetricsSnapshot};
use crate::query::{LogFilter, LogPage};
use crate::queue::StagingQueue;
use crate::rate_limited_logger::RateLimitedLogger;
use crate::record::{FailedRecord, InFlightRecord, RawRecord, RecordId, normalize};
use crate::timer::FlushTimer;

/// State shared by every clone of a [`LogBuffer`] and its background tasks
pub(crate) struct Shared {
    pub(crate) config: BufferConfig,
    pub(crate) backend: Arc<dyn StorageBackend>,
    pub(crate) queue: StagingQueue,
    pub(crate) ledger: FailureLedger,
    pub(crate) metrics: BufferMetrics,
    /// Single-flight flag for the flusher
    pub(crate) processing: AtomicBool,
    pub(crate) phase: AtomicU8,
    pub(crate) failure_log: RateLimitedLogger,
    timer: Mutex<Option<FlushTimer>>,
}

/// What [`LogBuffer::close`] did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CloseReport {
    /// Final drain, `None` if it failed
    pub drain: Option<DrainReport>,
    /// Staged records discarded after the drain
    pub dropped: usize,
    /// Records still quarantined at shutdown
    pub quarantined: usize,
}

/// What [`LogBuffer::clear_buffer`] removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClearReport {
    pub queued: usize,
    pub failed: usize,
}

/// Cloneable handle to the ingestion buffer
#[derive(Clone)]
pub struct LogBuffer {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for LogBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogBuffer")
            .field("backend", &self.shared.backend.name())
            .field("buffer_size", &self.shared.queue.len())
            .field("phase", &self.shared.phase())
            .finish()
    }
}

impl LogBuffer {
    /// Create a buffer writing to `backend`
    ///
    /// No background work starts until [`open`](Self::open).
    pub fn new(config: BufferConfig, backend: Arc<dyn StorageBackend>) -> Self {
        let shared = Shared {
            queue: StagingQueue::with_capacity(config.batch_size),
            config,
            backend,
            ledger: FailureLedger::new(),
            metrics: BufferMetrics::new(),
            processing: AtomicBool::new(false),
            phase: AtomicU8::new(FlushPhase::Idle as u8),
            failure_log: RateLimitedLogger::default(),
            timer: Mutex::new(None),
        };
        Self {
            shared: Arc::new(shared),
        }
    }

    /// Get reference to config
    pub fn config(&self) -> &BufferConfig {
        &self.shared.config
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Start the flush timer on the current tokio runtime
    ///
    /// Nothing starts if [`BufferConfig::validate`] rejects the config.
    pub fn open(&self) -> Result<()> {
        self.shared.config.validate()?;
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| BufferError::NoRuntime(e.to_string()))?;

        let mut timer = self.shared.timer.lock();
        if timer.is_some() {
            return Err(BufferError::AlreadyOpen);
        }
        *timer = Some(FlushTimer::spawn(
            &handle,
            self.shared.config.flush_interval,
            Arc::downgrade(&self.shared),
        ));

        info!(
            backend = self.shared.backend.name(),
            batch_size = self.shared.config.batch_size,
            flush_interval_ms = self.shared.config.flush_interval.as_millis(),
            max_retries = self.shared.config.max_retries,
            "log buffer opened"
        );
        Ok(())
    }

    /// Whether the flush timer is running
    pub fn is_open(&self) -> bool {
        self.shared.timer.lock().is_some()
    }

    /// Graceful shutdown
    ///
    /// Stops the timer, waits (bounded) for an in-progress flush, drains the
    /// queue, then discards whatever could not be flushed. Never fails: drain
    /// errors are logged and reflected in the report.
    pub async fn close(&self) -> CloseReport {
        let wait = self.shared.config.shutdown_wait;

        let timer = self.shared.timer.lock().take();
        if let Some(timer) = timer {
            timer.stop(wait).await;
        }

        if !self.shared.wait_idle(wait).await {
            warn!(
                wait_ms = wait.as_millis(),
                "in-progress flush did not finish before shutdown drain"
            );
        }

        let drain = match self.shared.drain().await {
            Ok(report) => Some(report),
            Err(e) => {
                tracing::error!(error = %e, "shutdown drain failed");
                None
            }
        };

        let dropped = self.shared.queue.clear();
        if dropped > 0 {
            warn!(dropped, "discarding unflushed records at shutdown");
        }
        let quarantined = self.shared.ledger.failed_count();
        if quarantined > 0 {
            warn!(quarantined, "permanently failed records lost at shutdown");
        }

        let snapshot = self.shared.metrics.snapshot();
        info!(
            processed = snapshot.total_processed,
            failed = snapshot.total_failed,
            batches = snapshot.batches_committed,
            "log buffer closed"
        );

        CloseReport {
            drain,
            dropped,
            quarantined,
        }
    }

    // =========================================================================
    // Ingestion
    // =========================================================================

    /// Normalize and stage a record
    ///
    /// Never waits on storage. When the queue reaches `batch_size` a flush is
    /// spawned in the background.
    pub fn add_log(&self, raw: RawRecord) -> RecordId {
        let record = normalize(raw);
        let id = record.id;
        let len = self.shared.queue.append(record);
        self.shared.metrics.record_received();

        if len >= self.shared.config.batch_size {
            self.spawn_flush();
        }
        id
    }

    /// Size-triggered flush, run off the producer's path
    fn spawn_flush(&self) {
        if self.shared.is_processing() {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            debug!("no runtime for size-triggered flush, leaving it to the timer");
            return;
        };
        let shared = Arc::clone(&self.shared);
        handle.spawn(async move {
            if let Err(e) = shared.flush().await {
                shared.failure_log.error("size-triggered flush", &e);
            }
        });
    }

    // =========================================================================
    // Flush control
    // =========================================================================

    /// Run one flush attempt now
    pub async fn flush(&self) -> Result<FlushOutcome> {
        self.shared.flush().await
    }

    /// Flush repeatedly until the queue is empty or the attempt budget is spent
    pub async fn force_flush(&self) -> Result<DrainReport> {
        self.shared.drain().await
    }

    /// Re-enqueue every quarantined record with a fresh retry budget
    ///
    /// Triggers one flush afterwards. Returns the number of records re-enqueued.
    pub async fn retry_failed_logs(&self) -> Result<usize> {
        let now = Utc::now();
        let count = self.shared.queue.with_locked(|queue| {
            let failed = self.shared.ledger.take_failed();
            let count = failed.len();
            for entry in failed {
                let mut record = entry.record;
                record.reset_failures(now);
                queue.push_back(record);
            }
            count
        });

        if count == 0 {
            info!("no permanently failed records to retry");
            return Ok(0);
        }

        info!(count, "re-enqueued permanently failed records");
        self.shared.flush().await?;
        Ok(count)
    }

    /// Drop everything staged and everything quarantined
    pub fn clear_buffer(&self) -> ClearReport {
        let report = self.shared.queue.with_locked(|queue| {
            let queued = queue.len();
            queue.clear();
            ClearReport {
                queued,
                failed: self.shared.ledger.clear_failed(),
            }
        });
        warn!(
            queued = report.queued,
            failed = report.failed,
            "buffer cleared"
        );
        report
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Page through staged records
    pub fn get_stored_logs(&self, filter: &LogFilter) -> LogPage {
        filter.apply(self.shared.queue.snapshot())
    }

    /// Records claimed by the active flush
    pub fn get_pending_logs(&self) -> Vec<InFlightRecord> {
        self.shared.ledger.list_in_flight()
    }

    /// Quarantined records
    pub fn get_failed_logs(&self) -> Vec<FailedRecord> {
        self.shared.ledger.list_permanently_failed()
    }

    /// Operational statistics
    pub fn get_stats(&self) -> BufferStats {
        let snapshot = self.shared.metrics.snapshot();
        BufferStats {
            buffer_size: self.shared.queue.len(),
            total_processed: snapshot.total_processed,
            total_failed: snapshot.total_failed,
            pending_count: self.shared.ledger.in_flight_count(),
            permanently_failed_count: self.shared.ledger.failed_count(),
            success_rate: snapshot.success_rate(),
            is_processing: self.shared.is_processing(),
            last_processed_at: self.shared.metrics.last_processed_at(),
        }
    }

    /// Raw counters
    pub fn metrics(&self) -> MetricsSnapshot {
        self.shared.metrics.snapshot()
    }

    /// Current flusher phase
    pub fn phase(&self) -> FlushPhase {
        self.shared.phase()
    }

    /// Whether a flush is running
    pub fn is_processing(&self) -> bool {
        self.shared.is_processing()
    }

    /// Number of staged records
    pub fn len(&self) -> usize {
        self.shared.queue.len()
    }

    /// Whether nothing is staged
    pub fn is_empty(&self) -> bool {
        self.shared.queue.is_empty()
    }
}

#[cfg(test)]
#[path = "buffer_test.rs"]
mod buffer_test;

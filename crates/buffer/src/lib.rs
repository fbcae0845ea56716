//! Spool - Buffer
//!
//! Buffered ingestion and batch-flush engine. Producers stage records in
//! memory; a single-flight flusher releases them to a storage backend in
//! bounded batches, on a size or time trigger, with bounded retry, quarantine
//! of records that keep failing, and a bounded drain on shutdown.
//!
//! # Architecture
//!
//! ```text
//! producer ──add_log──→ [Normalizer] ──→ [StagingQueue]
//!                                             │  size trigger / timer
//!                                             ▼
//!                                        [Flusher] ──ensure_partition──→ ┐
//!                                             │     ──bulk_insert──────→ [StorageBackend]
//!                                  failure    │
//!                     ┌───────────────────────┤
//!                     ▼                       ▼
//!              re-queue (tail)         [FailureLedger] (quarantine)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use spool_buffer::{BufferConfig, LogBuffer, RawRecord};
//!
//! let buffer = LogBuffer::new(BufferConfig::default(), Arc::new(backend));
//! buffer.open()?;
//!
//! buffer.add_log(RawRecord::new("http", "GET / 200"));
//!
//! // On shutdown
//! let report = buffer.close().await;
//! ```

mod backend;
mod buffer;
mod config;
mod drain;
mod error;
mod flusher;
mod ledger;
mod metrics;
mod query;
mod queue;
mod rate_limited_logger;
mod record;
mod timer;

#[cfg(test)]
mod test_utils;

pub use backend::{StorageBackend, StorageError, partition_key};
pub use buffer::{ClearReport, CloseReport, LogBuffer};
pub use config::{
    BufferConfig, DEFAULT_BATCH_SIZE, DEFAULT_DRAIN_MAX_ATTEMPTS, DEFAULT_DRAIN_POLL_INTERVAL,
    DEFAULT_FLUSH_INTERVAL, DEFAULT_MAX_RETRIES, DEFAULT_PERSIST_TIMEOUT, DEFAULT_SHUTDOWN_WAIT,
};
pub use drain::DrainReport;
pub use error::{BufferError, Result};
pub use flusher::{FlushOutcome, FlushPhase, SkipReason};
pub use ledger::FailureLedger;
pub use metrics::{BufferMetrics, BufferStats, MetricsSnapshot};
pub use query::{DEFAULT_PAGE_LIMIT, LogFilter, LogPage, MAX_PAGE_LIMIT};
pub use queue::StagingQueue;
pub use rate_limited_logger::RateLimitedLogger;
pub use record::{
    BatchId, DEFAULT_LEVEL, FailedRecord, InFlightRecord, Metadata, RawRecord, Record, RecordId,
    normalize,
};

//! Storage backend contract
//!
//! The buffer only needs two things from storage: make sure the partition for
//! a date exists, and insert a batch atomically.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};

use crate::record::Record;

/// Errors reported by a storage backend
///
/// The flusher treats every variant as "this attempt failed"; anything coming
/// out of `ensure_partition`, including its deadline, is escalated.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Backend unreachable
    #[error("connection error: {0}")]
    Connection(String),

    /// Bulk insert rejected
    #[error("insert error: {0}")]
    Insert(String),

    /// Destination partition missing or could not be provisioned
    #[error("partition {partition} unavailable: {reason}")]
    Partition { partition: String, reason: String },

    /// Query against the backend failed
    #[error("query error: {0}")]
    Query(String),

    /// Backend call did not finish before the persistence deadline
    #[error("{backend} {operation} timed out after {millis}ms")]
    Timeout {
        backend: &'static str,
        operation: &'static str,
        millis: u128,
    },
}

impl StorageError {
    /// Create an insert error
    pub fn insert(msg: impl Into<String>) -> Self {
        Self::Insert(msg.into())
    }

    /// Create a partition error
    pub fn partition(partition: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Partition {
            partition: partition.into(),
            reason: reason.into(),
        }
    }
}

/// Relational store that persists flushed batches
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &'static str;

    /// Make sure the partition covering `for_date` exists (idempotent)
    async fn ensure_partition(&self, for_date: DateTime<Utc>) -> Result<(), StorageError>;

    /// Insert all records or none of them
    async fn bulk_insert(&self, records: &[Record]) -> Result<(), StorageError>;
}

/// Monthly partition key, e.g. `2024_03`
pub fn partition_key(date: DateTime<Utc>) -> String {
    format!("{:04}_{:02}", date.year(), date.month())
}

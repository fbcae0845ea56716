//! In-memory backend
//!
//! Keeps every persisted record in process memory and remembers which month
//! partitions were requested. Used for local runs without a database.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use spool_buffer::{Record, StorageBackend, StorageError, partition_key};

/// Process-local storage
#[derive(Debug, Default)]
pub struct MemoryBackend {
    records: Mutex<Vec<Record>>,
    partitions: Mutex<BTreeSet<String>>,
    batches: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Persisted records in insert order
    pub fn records(&self) -> Vec<Record> {
        self.records.lock().clone()
    }

    /// Number of persisted records
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Number of successful bulk inserts
    pub fn batch_count(&self) -> usize {
        self.batches.load(Ordering::Relaxed)
    }

    /// Partition keys (`YYYY_MM`) provisioned so far, sorted
    pub fn partitions(&self) -> Vec<String> {
        self.partitions.lock().iter().cloned().collect()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn ensure_partition(&self, for_date: DateTime<Utc>) -> Result<(), StorageError> {
        let key = partition_key(for_date);
        if self.partitions.lock().insert(key.clone()) {
            tracing::debug!(partition = %key, "created partition");
        }
        Ok(())
    }

    async fn bulk_insert(&self, records: &[Record]) -> Result<(), StorageError> {
        self.records.lock().extend_from_slice(records);
        self.batches.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod memory_test;

//! Scripted storage backend for buffer tests

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::backend::{StorageBackend, StorageError, partition_key};
use crate::record::Record;

/// Backend whose failures and latency are controlled by the test
#[derive(Debug, Default)]
pub(crate) struct ScriptedBackend {
    pub(crate) inserted: Mutex<Vec<Vec<Record>>>,
    pub(crate) partition_calls: AtomicUsize,
    pub(crate) insert_calls: AtomicUsize,
    fail_inserts: AtomicBool,
    fail_partitions: AtomicBool,
    insert_delay: Mutex<Option<Duration>>,
    partition_delay: Mutex<Option<Duration>>,
    active_inserts: AtomicUsize,
    pub(crate) max_concurrent_inserts: AtomicUsize,
}

impl ScriptedBackend {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn failing() -> Self {
        let backend = Self::default();
        backend.set_fail_inserts(true);
        backend
    }

    pub(crate) fn set_fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn set_fail_partitions(&self, fail: bool) {
        self.fail_partitions.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn set_insert_delay(&self, delay: Duration) {
        *self.insert_delay.lock() = Some(delay);
    }

    pub(crate) fn set_partition_delay(&self, delay: Duration) {
        *self.partition_delay.lock() = Some(delay);
    }

    pub(crate) fn insert_calls(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn partition_calls(&self) -> usize {
        self.partition_calls.load(Ordering::SeqCst)
    }

    /// Every record persisted so far, in insert order
    pub(crate) fn persisted(&self) -> Vec<Record> {
        self.inserted.lock().iter().flatten().cloned().collect()
    }
}

#[async_trait]
impl StorageBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn ensure_partition(&self, for_date: DateTime<Utc>) -> Result<(), StorageError> {
        self.partition_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.partition_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_partitions.load(Ordering::SeqCst) {
            return Err(StorageError::partition(partition_key(for_date), "scripted failure"));
        }
        Ok(())
    }

    async fn bulk_insert(&self, records: &[Record]) -> Result<(), StorageError> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        let active = self.active_inserts.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_concurrent_inserts.fetch_max(active, Ordering::SeqCst);

        let delay = *self.insert_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.active_inserts.fetch_sub(1, Ordering::SeqCst);

        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(StorageError::insert("scripted failure"));
        }
        self.inserted.lock().push(records.to_vec());
        Ok(())
    }
}

//! Staging queue
//!
//! Ordered sequence of normalized records waiting to be flushed. Producers
//! append at the tail. The flusher claims prefixes from the head and re-queues
//! failed records at the tail through [`StagingQueue::with_locked`], so those
//! moves stay atomic with the failure ledger.

use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::record::Record;

/// Initial capacity of the backing deque
const INITIAL_CAPACITY: usize = 1024;

/// FIFO staging queue shared between producers and the flusher
///
/// Every operation holds the lock only for the in-memory mutation itself, so
/// appends never wait on storage I/O.
#[derive(Debug)]
pub struct StagingQueue {
    inner: Mutex<VecDeque<Record>>,
}

impl StagingQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::with_capacity(INITIAL_CAPACITY)
    }

    /// Create an empty queue with pre-allocated capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Append a record at the tail, returning the new length
    pub fn append(&self, record: Record) -> usize {
        let mut queue = self.inner.lock();
        queue.push_back(record);
        queue.len()
    }

    /// Number of staged records
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Whether nothing is staged
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Drop every staged record, returning how many were removed
    pub fn clear(&self) -> usize {
        let mut queue = self.inner.lock();
        let dropped = queue.len();
        queue.clear();
        dropped
    }

    /// Copy of the staged records in queue order
    pub fn snapshot(&self) -> Vec<Record> {
        self.inner.lock().iter().cloned().collect()
    }

    /// Run `f` with exclusive access to the queue
    ///
    /// Used when a queue mutation must be atomic with a ledger mutation. Callers
    /// take the queue lock first and the ledger locks second.
    pub(crate) fn with_locked<R>(&self, f: impl FnOnce(&mut VecDeque<Record>) -> R) -> R {
        let mut queue = self.inner.lock();
        f(&mut queue)
    }
}

impl Default for StagingQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "queue_test.rs"]
mod queue_test;

//! Failure ledger
//!
//! Two maps keyed by record id: records claimed by the active flush, and
//! records that exhausted their retry budget (quarantine). Both are listable,
//! and quarantined records can be taken back out for an operator retry.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::record::{BatchId, FailedRecord, InFlightRecord, Record, RecordId};

#[derive(Debug, Default)]
pub struct FailureLedger {
    in_flight: Mutex<HashMap<RecordId, InFlightRecord>>,
    failed: Mutex<HashMap<RecordId, FailedRecord>>,
}

impl FailureLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly claimed batch as in flight
    pub fn track_in_flight(&self, records: &[Record], batch_id: BatchId, started_at: DateTime<Utc>) {
        let mut in_flight = self.in_flight.lock();
        in_flight.reserve(records.len());
        for record in records {
            in_flight.insert(
                record.id,
                InFlightRecord {
                    record: record.clone(),
                    batch_id,
                    started_at,
                },
            );
        }
    }

    /// Forget in-flight entries once their batch has an outcome
    pub fn release_in_flight<'a>(&self, ids: impl IntoIterator<Item = &'a RecordId>) {
        let mut in_flight = self.in_flight.lock();
        for id in ids {
            in_flight.remove(id);
        }
    }

    /// Move a record into quarantine
    pub fn quarantine(
        &self,
        record: Record,
        reason: &str,
        batch_id: BatchId,
        at: DateTime<Utc>,
    ) {
        self.failed.lock().insert(
            record.id,
            FailedRecord {
                record,
                final_failure_reason: reason.to_string(),
                final_failure_at: at,
                batch_id,
            },
        );
    }

    /// Remove and return every quarantined record, oldest `created_at` first
    pub fn take_failed(&self) -> Vec<FailedRecord> {
        let mut taken: Vec<FailedRecord> = self.failed.lock().drain().map(|(_, v)| v).collect();
        taken.sort_by_key(|f| f.record.created_at);
        taken
    }

    /// Drop every quarantined record, returning how many were removed
    pub fn clear_failed(&self) -> usize {
        let mut failed = self.failed.lock();
        let count = failed.len();
        failed.clear();
        count
    }

    /// In-flight records, ordered by claim time then creation time
    pub fn list_in_flight(&self) -> Vec<InFlightRecord> {
        let mut list: Vec<InFlightRecord> = self.in_flight.lock().values().cloned().collect();
        list.sort_by_key(|e| (e.started_at, e.record.created_at));
        list
    }

    /// Quarantined records, most recent failure first
    pub fn list_permanently_failed(&self) -> Vec<FailedRecord> {
        let mut list: Vec<FailedRecord> = self.failed.lock().values().cloned().collect();
        list.sort_by(|a, b| b.final_failure_at.cmp(&a.final_failure_at));
        list
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.lock().len()
    }
}

#[cfg(test)]
#[path = "ledger_test.rs"]
mod ledger_test;

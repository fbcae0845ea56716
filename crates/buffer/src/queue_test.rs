//! Tests for the staging queue

use super::*;
use crate::record::{RawRecord, normalize};

fn record(message: &str) -> Record {
    normalize(RawRecord::new("test", message))
}

fn messages(records: &[Record]) -> Vec<&str> {
    records.iter().map(|r| r.message.as_str()).collect()
}

#[test]
fn test_new_queue_is_empty() {
    let queue = StagingQueue::new();
    assert!(queue.is_empty());
    assert_eq!(queue.len(), 0);
}

#[test]
fn test_append_returns_length() {
    let queue = StagingQueue::new();
    assert_eq!(queue.append(record("a")), 1);
    assert_eq!(queue.append(record("b")), 2);
    assert_eq!(queue.len(), 2);
}

#[test]
fn test_snapshot_keeps_append_order() {
    let queue = StagingQueue::new();
    for m in ["a", "b", "c"] {
        queue.append(record(m));
    }

    assert_eq!(messages(&queue.snapshot()), ["a", "b", "c"]);
    assert_eq!(queue.len(), 3);
}

#[test]
fn test_with_locked_mutation_is_visible() {
    let queue = StagingQueue::new();
    for m in ["a", "b", "c"] {
        queue.append(record(m));
    }

    let head = queue.with_locked(|q| {
        let head = q.pop_front();
        if let Some(ref r) = head {
            q.push_back(r.clone());
        }
        head
    });

    assert_eq!(head.map(|r| r.message), Some("a".to_string()));
    assert_eq!(messages(&queue.snapshot()), ["b", "c", "a"]);
}

#[test]
fn test_clear_reports_dropped() {
    let queue = StagingQueue::new();
    queue.append(record("a"));
    queue.append(record("b"));

    assert_eq!(queue.clear(), 2);
    assert!(queue.is_empty());
    assert_eq!(queue.clear(), 0);
}

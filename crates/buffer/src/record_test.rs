//! Tests for record normalization

use chrono::TimeZone;
use serde_json::json;

use super::*;

#[test]
fn test_normalize_defaults() {
    let record = normalize(RawRecord::new("http", "request served"));

    assert_eq!(record.level, DEFAULT_LEVEL);
    assert_eq!(record.kind, "http");
    assert_eq!(record.message, "request served");
    assert_eq!(record.metadata, Metadata::Null);
    assert_eq!(record.retry_count, 0);
    assert!(record.last_failure_reason.is_none());
    assert!(record.last_failure_at.is_none());
    assert_eq!(record.created_at, record.enqueued_at);
}

#[test]
fn test_normalize_blank_level_uses_default() {
    let record = normalize(RawRecord::new("http", "x").with_level("   "));
    assert_eq!(record.level, "info");
}

#[test]
fn test_normalize_keeps_producer_fields() {
    let created = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    let record = normalize(
        RawRecord::new("auth", "login failed")
            .with_level("error")
            .with_created_at(created),
    );

    assert_eq!(record.level, "error");
    assert_eq!(record.created_at, created);
    assert!(record.enqueued_at > created);
}

#[test]
fn test_normalize_assigns_unique_ids() {
    let a = normalize(RawRecord::new("t", "a"));
    let b = normalize(RawRecord::new("t", "b"));
    assert_ne!(a.id, b.id);
}

#[test]
fn test_metadata_variants() {
    assert_eq!(Metadata::from_value(None), Metadata::Null);
    assert_eq!(Metadata::from_value(Some(json!(null))), Metadata::Null);
    assert_eq!(
        Metadata::from_value(Some(json!("{\"already\":\"serialized\"}"))),
        Metadata::Raw("{\"already\":\"serialized\"}".into())
    );
    assert_eq!(
        Metadata::from_value(Some(json!({"user": 42}))),
        Metadata::Structured(json!({"user": 42}))
    );
}

#[test]
fn test_metadata_to_json_string() {
    assert_eq!(Metadata::Null.to_json_string(), None);
    assert_eq!(
        Metadata::Raw("plain text".into()).to_json_string().as_deref(),
        Some("plain text")
    );
    assert_eq!(
        Metadata::Structured(json!({"a": 1})).to_json_string().as_deref(),
        Some(r#"{"a":1}"#)
    );
}

#[test]
fn test_raw_record_deserialize() {
    let raw: RawRecord = serde_json::from_str(
        r#"{"type": "job", "message": "done", "metadata": {"ms": 12}, "createdAt": "2024-05-01T00:00:00Z"}"#,
    )
    .unwrap();

    assert_eq!(raw.kind, "job");
    assert_eq!(raw.message, "done");
    assert!(raw.level.is_none());
    assert_eq!(raw.metadata, Some(json!({"ms": 12})));
    assert_eq!(
        raw.created_at,
        Some(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap())
    );
}

#[test]
fn test_record_failure_and_reset() {
    let mut record = normalize(RawRecord::new("t", "m"));
    let at = Utc::now();

    record.record_failure("connection refused", at);
    record.record_failure("connection refused", at);
    assert_eq!(record.retry_count, 2);
    assert_eq!(record.last_failure_reason.as_deref(), Some("connection refused"));
    assert_eq!(record.last_failure_at, Some(at));

    record.reset_failures(at);
    assert_eq!(record.retry_count, 0);
    assert!(record.last_failure_reason.is_none());
    assert!(record.last_failure_at.is_none());
}

#[test]
fn test_record_serializes_type_field() {
    let record = normalize(RawRecord::new("billing", "charged").with_metadata(json!("raw")));
    let value = serde_json::to_value(&record).unwrap();
    assert_eq!(value["type"], "billing");
    assert_eq!(value["metadata"], "raw");
}

//! Tests for the run command

use std::time::Duration;

use spool_config::ClickHouseSection;

use super::*;

fn memory_buffer(batch_size: usize) -> (LogBuffer, Arc<MemoryBackend>) {
    let backend = Arc::new(MemoryBackend::new());
    let buffer = LogBuffer::new(
        BufferConfig::default().with_batch_size(batch_size),
        backend.clone(),
    );
    (buffer, backend)
}

#[test]
fn test_parse_record() {
    let raw = parse_record(r#"{"type":"http","message":"GET /","level":"warn","metadata":{"ms":3}}"#)
        .unwrap();
    assert_eq!(raw.kind, "http");
    assert_eq!(raw.level.as_deref(), Some("warn"));

    assert!(parse_record("not json").is_err());
    assert!(parse_record(r#"{"message":"no type"}"#).is_err());
    assert_eq!(
        parse_record(r#"{"type":"  ","message":"x"}"#).unwrap_err(),
        "missing type"
    );
    assert_eq!(
        parse_record(r#"{"type":"job","message":""}"#).unwrap_err(),
        "missing message"
    );
}

#[tokio::test]
async fn test_ingest_counts_lines() {
    let (buffer, backend) = memory_buffer(100);
    let input = concat!(
        "{\"type\":\"job\",\"message\":\"one\"}\n",
        "\n",
        "garbage\n",
        "{\"type\":\"job\",\"message\":\"two\",\"createdAt\":\"2024-02-01T00:00:00Z\"}\n",
    );
    let mut summary = IngestSummary::default();

    ingest(input.as_bytes(), &buffer, &mut summary).await.unwrap();

    assert_eq!(summary, IngestSummary { accepted: 2, rejected: 1 });
    assert_eq!(buffer.len(), 2);
    assert!(backend.is_empty());
}

#[tokio::test]
async fn test_ingest_then_close_persists_everything() {
    let (buffer, backend) = memory_buffer(2);
    let input: String = (0..5)
        .map(|i| format!("{{\"type\":\"job\",\"message\":\"step {i}\"}}\n"))
        .collect();
    let mut summary = IngestSummary::default();

    ingest(input.as_bytes(), &buffer, &mut summary).await.unwrap();
    let report = buffer.close().await;

    assert_eq!(summary.accepted, 5);
    assert_eq!(report.dropped, 0);
    assert_eq!(backend.len(), 5);
    assert_eq!(buffer.get_stats().total_processed, 5);
}

#[test]
fn test_buffer_config_mapping() {
    let section = BufferSection {
        batch_size: 7,
        flush_interval: Duration::from_secs(2),
        max_retries: 1,
        persist_timeout: Duration::from_millis(300),
        drain_max_attempts: 4,
        drain_poll_interval: Duration::from_millis(20),
        shutdown_wait: Duration::from_secs(1),
    };
    let config = buffer_config(&section);

    assert_eq!(config.batch_size, 7);
    assert_eq!(config.flush_interval, Duration::from_secs(2));
    assert_eq!(config.max_retries, 1);
    assert_eq!(config.persist_timeout, Duration::from_millis(300));
    assert_eq!(config.drain_max_attempts, 4);
    assert_eq!(config.drain_poll_interval, Duration::from_millis(20));
    assert_eq!(config.shutdown_wait, Duration::from_secs(1));
}

#[test]
fn test_build_backend() {
    let backend = build_backend(&StorageSection::default()).unwrap();
    assert_eq!(backend.name(), "memory");

    let storage = StorageSection {
        backend: StorageKind::Clickhouse,
        clickhouse: ClickHouseSection {
            url: "http://localhost:8123".into(),
            ..Default::default()
        },
    };
    let backend = build_backend(&storage).unwrap();
    assert_eq!(backend.name(), "clickhouse");

    let storage = StorageSection {
        backend: StorageKind::Clickhouse,
        clickhouse: ClickHouseSection {
            url: "http://localhost:8123".into(),
            table: "bad-name".into(),
            ..Default::default()
        },
    };
    assert!(build_backend(&storage).is_err());
}

#[tokio::test]
async fn test_open_missing_input_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.jsonl");
    assert!(open_input(Some(path.as_path())).await.is_err());
}

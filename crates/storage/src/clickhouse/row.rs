//! Log table row type

use clickhouse::Row;
use serde::Serialize;
use serde_repr::Serialize_repr;
use spool_buffer::Record;
use uuid::Uuid;

/// Log level enum matching ClickHouse Enum8 (RFC 5424 syslog levels + TRACE)
///
/// Maps to: Enum8('EMERGENCY'=0, 'ALERT'=1, 'CRITICAL'=2, 'ERROR'=3, 'WARNING'=4, 'NOTICE'=5, 'INFO'=6, 'DEBUG'=7, 'TRACE'=8)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr)]
#[repr(i8)]
pub enum LogLevelEnum {
    Emergency = 0,
    Alert = 1,
    Critical = 2,
    Error = 3,
    Warning = 4,
    Notice = 5,
    Info = 6,
    Debug = 7,
    Trace = 8,
}

impl LogLevelEnum {
    /// Convert from a record's level name (case-insensitive)
    ///
    /// Unknown names map to `Info`, the same default the normalizer applies.
    pub fn from_level(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "EMERGENCY" | "FATAL" => Self::Emergency,
            "ALERT" => Self::Alert,
            "CRITICAL" | "CRIT" => Self::Critical,
            "ERROR" | "ERR" => Self::Error,
            "WARNING" | "WARN" => Self::Warning,
            "NOTICE" => Self::Notice,
            "DEBUG" => Self::Debug,
            "TRACE" => Self::Trace,
            _ => Self::Info,
        }
    }
}

/// One row of the logs table
#[derive(Debug, Clone, Row, Serialize)]
pub struct LogRow {
    /// Record id assigned at normalization
    #[serde(with = "clickhouse::serde::uuid")]
    pub id: Uuid,

    /// Severity
    pub level: LogLevelEnum,

    /// Producer-defined record type
    #[serde(rename = "type")]
    pub kind: String,

    pub message: String,

    /// Metadata as JSON text
    pub metadata: Option<String>,

    /// Producer time in milliseconds (partition key)
    pub created_at: i64,

    /// Failed attempts before this one succeeded
    pub retry_count: u32,
}

impl From<&Record> for LogRow {
    fn from(record: &Record) -> Self {
        Self {
            id: record.id.as_uuid(),
            level: LogLevelEnum::from_level(&record.level),
            kind: record.kind.clone(),
            message: record.message.clone(),
            metadata: record.metadata.to_json_string(),
            created_at: record.created_at.timestamp_millis(),
            retry_count: record.retry_count,
        }
    }
}

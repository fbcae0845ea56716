//! Record model and normalization
//!
//! A [`RawRecord`] is what producers hand to the buffer. [`normalize`] turns it
//! into a [`Record`] by stamping an identifier, timestamps and a retry counter.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Level assigned when the producer does not supply one
pub const DEFAULT_LEVEL: &str = "info";

// =============================================================================
// Identifiers
// =============================================================================

/// Process-unique record identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(Uuid);

impl RecordId {
    /// Generate a fresh identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Underlying UUID
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Short-lived identifier tagging one flush attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(Uuid);

impl BatchId {
    /// Generate a fresh identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// =============================================================================
// Metadata
// =============================================================================

/// Opaque producer metadata, resolved once at normalization time
///
/// Producers sometimes send a structured object and sometimes a string that was
/// serialized upstream. The variant records which one arrived so nothing
/// downstream has to sniff the payload again.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(untagged)]
pub enum Metadata {
    /// No metadata supplied
    #[default]
    Null,
    /// Structured JSON value (object, array, number, bool)
    Structured(serde_json::Value),
    /// Pre-serialized string, stored verbatim
    Raw(String),
}

impl Metadata {
    /// Resolve producer input into a metadata variant
    pub fn from_value(value: Option<serde_json::Value>) -> Self {
        match value {
            None | Some(serde_json::Value::Null) => Self::Null,
            Some(serde_json::Value::String(s)) => Self::Raw(s),
            Some(other) => Self::Structured(other),
        }
    }

    /// Whether no metadata was supplied
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Text form for storage columns (`None` for [`Metadata::Null`])
    pub fn to_json_string(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Structured(value) => Some(value.to_string()),
            Self::Raw(s) => Some(s.clone()),
        }
    }
}

// =============================================================================
// Raw input
// =============================================================================

/// Producer-supplied record, before normalization
///
/// `type` and `message` are required; the ingestion boundary rejects input
/// without them before it reaches the buffer.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawRecord {
    /// Severity level, defaults to `info`
    #[serde(default)]
    pub level: Option<String>,

    /// Record type (producer-defined category)
    #[serde(rename = "type")]
    pub kind: String,

    /// Human-readable message
    pub message: String,

    /// Arbitrary structured payload or pre-serialized string
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,

    /// Producer timestamp, defaults to normalization time
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
}

impl RawRecord {
    /// Create a raw record with the two required fields
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            ..Default::default()
        }
    }

    /// Set the level
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = Some(level.into());
        self
    }

    /// Set the metadata payload
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Set the producer timestamp
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }
}

// =============================================================================
// Normalized record
// =============================================================================

/// A normalized record as it lives in the buffer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub id: RecordId,
    pub level: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub metadata: Metadata,
    /// Producer time; immutable
    pub created_at: DateTime<Utc>,
    /// When the record last entered the staging queue
    pub enqueued_at: DateTime<Utc>,
    /// Failed flush attempts that re-queued this record
    pub retry_count: u32,
    pub last_failure_reason: Option<String>,
    pub last_failure_at: Option<DateTime<Utc>>,
}

impl Record {
    /// Count a failed attempt and stamp its reason
    pub(crate) fn record_failure(&mut self, reason: &str, at: DateTime<Utc>) {
        self.retry_count += 1;
        self.last_failure_reason = Some(reason.to_string());
        self.last_failure_at = Some(at);
        self.enqueued_at = at;
    }

    /// Forget all failure history (operator retry)
    pub(crate) fn reset_failures(&mut self, at: DateTime<Utc>) {
        self.retry_count = 0;
        self.last_failure_reason = None;
        self.last_failure_at = None;
        self.enqueued_at = at;
    }
}

/// Stamp a raw record with identity, timestamps and a zero retry counter
///
/// Never fails and performs no validation.
pub fn normalize(raw: RawRecord) -> Record {
    let now = Utc::now();

    let level = raw
        .level
        .filter(|l| !l.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_LEVEL.to_string());

    Record {
        id: RecordId::new(),
        level,
        kind: raw.kind,
        message: raw.message,
        metadata: Metadata::from_value(raw.metadata),
        created_at: raw.created_at.unwrap_or(now),
        enqueued_at: now,
        retry_count: 0,
        last_failure_reason: None,
        last_failure_at: None,
    }
}

// =============================================================================
// Ledger entries
// =============================================================================

/// A record claimed by an active flush
#[derive(Debug, Clone, Serialize)]
pub struct InFlightRecord {
    #[serde(flatten)]
    pub record: Record,
    pub batch_id: BatchId,
    pub started_at: DateTime<Utc>,
}

/// A record that exhausted its retry budget
#[derive(Debug, Clone, Serialize)]
pub struct FailedRecord {
    #[serde(flatten)]
    pub record: Record,
    pub final_failure_reason: String,
    pub final_failure_at: DateTime<Utc>,
    pub batch_id: BatchId,
}

#[cfg(test)]
#[path = "record_test.rs"]
mod record_test;

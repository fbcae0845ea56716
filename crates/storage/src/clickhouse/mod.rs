//! ClickHouse Backend
//!
//! Persists flushed batches into a single monthly-partitioned table using the
//! `clickhouse` crate's row inserts.
//!
//! ```sql
//! CREATE TABLE logs (
//!     id UUID,
//!     level Enum8('EMERGENCY'=0, 'ALERT'=1, 'CRITICAL'=2, 'ERROR'=3, 'WARNING'=4, 'NOTICE'=5, 'INFO'=6, 'DEBUG'=7, 'TRACE'=8),
//!     type LowCardinality(String),
//!     message String,
//!     metadata Nullable(String),
//!     created_at DateTime64(3),
//!     retry_count UInt32
//! ) ENGINE = MergeTree()
//! PARTITION BY toYYYYMM(created_at)
//! ORDER BY (created_at, type, level);
//! ```

mod backend;
mod config;
mod error;
mod row;

pub use backend::ClickHouseBackend;
pub use config::{ClickHouseConfig, DEFAULT_DATABASE, DEFAULT_TABLE, DEFAULT_URL};
pub use error::ClickHouseError;
pub use row::{LogLevelEnum, LogRow};

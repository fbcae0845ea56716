//! Spool - Storage
//!
//! [`StorageBackend`](spool_buffer::StorageBackend) implementations the buffer
//! flushes to.
//!
//! # Backends
//!
//! | Backend | Purpose |
//! |---------|---------|
//! | `clickhouse` | Monthly-partitioned `logs` table over HTTP |
//! | `memory` | Keeps persisted records in process memory |

pub mod clickhouse;
mod memory;

pub use clickhouse::{ClickHouseBackend, ClickHouseConfig, ClickHouseError, LogLevelEnum, LogRow};
pub use memory::MemoryBackend;

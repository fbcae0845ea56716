//! Buffer errors

use crate::backend::StorageError;
use crate::record::BatchId;

/// Errors surfaced to callers of the buffer
///
/// Insert failures never show up here: they are retried and quarantined
/// internally. Only failures the caller must hear about are returned.
#[derive(Debug, thiserror::Error)]
pub enum BufferError {
    /// Partition check failed; the batch was rolled back without an insert
    #[error("partition check failed for batch {batch_id}: {source}")]
    Partition {
        batch_id: BatchId,
        #[source]
        source: StorageError,
    },

    /// `open` called while the flush timer is already running
    #[error("flush timer already running")]
    AlreadyOpen,

    /// Runtime config the buffer cannot run with
    #[error("invalid buffer config: {field} {reason}")]
    InvalidConfig {
        field: &'static str,
        reason: &'static str,
    },

    /// Timer requested outside of a tokio runtime
    #[error("no async runtime available: {0}")]
    NoRuntime(String),
}

/// Result type for buffer operations
pub type Result<T> = std::result::Result<T, BufferError>;

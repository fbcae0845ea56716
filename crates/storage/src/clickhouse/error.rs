//! ClickHouse backend errors

use spool_buffer::StorageError;

/// Errors from the ClickHouse backend
#[derive(Debug, thiserror::Error)]
pub enum ClickHouseError {
    /// ClickHouse client error
    #[error("clickhouse error: {0}")]
    ClickHouse(#[from] clickhouse::error::Error),

    /// Target table does not exist
    #[error("table {0} does not exist")]
    MissingTable(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<ClickHouseError> for StorageError {
    fn from(err: ClickHouseError) -> Self {
        match err {
            ClickHouseError::ClickHouse(e) => StorageError::Insert(e.to_string()),
            ClickHouseError::MissingTable(table) => {
                StorageError::Query(format!("table {table} does not exist"))
            }
            ClickHouseError::Config(msg) => StorageError::Connection(msg),
        }
    }
}

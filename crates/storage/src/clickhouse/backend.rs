//! ClickHouse backend implementation

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clickhouse::{Client, insert::Insert};
use parking_lot::Mutex;
use spool_buffer::{Record, StorageBackend, StorageError, partition_key};

use super::config::ClickHouseConfig;
use super::error::ClickHouseError;
use super::row::LogRow;

/// Writes batches into a monthly-partitioned ClickHouse table
///
/// ClickHouse creates `toYYYYMM` partitions on insert, so `ensure_partition`
/// only has to confirm the table is there. The check runs once per month key.
pub struct ClickHouseBackend {
    client: Client,
    config: ClickHouseConfig,
    verified: Mutex<HashSet<String>>,
}

impl std::fmt::Debug for ClickHouseBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClickHouseBackend")
            .field("url", &self.config.url)
            .field("database", &self.config.database)
            .field("table", &self.config.table)
            .finish()
    }
}

impl ClickHouseBackend {
    /// Create a backend from config
    ///
    /// # Errors
    ///
    /// Returns error if the database or table name is not a plain identifier.
    pub fn new(config: ClickHouseConfig) -> Result<Self, ClickHouseError> {
        validate_identifier("database", &config.database)?;
        validate_identifier("table", &config.table)?;

        Ok(Self {
            client: config.build_client(),
            config,
            verified: Mutex::new(HashSet::new()),
        })
    }

    /// Get reference to config
    pub fn config(&self) -> &ClickHouseConfig {
        &self.config
    }

    /// Whether the table was already confirmed for `key` (`YYYY_MM`)
    pub fn is_verified(&self, key: &str) -> bool {
        self.verified.lock().contains(key)
    }

    async fn table_exists(&self) -> Result<bool, ClickHouseError> {
        let sql = format!("EXISTS TABLE {}", self.config.qualified_table());
        let exists: u8 = self.client.query(&sql).fetch_one().await?;
        Ok(exists == 1)
    }

    async fn do_insert(&self, rows: &[LogRow]) -> Result<(), ClickHouseError> {
        let mut insert: Insert<LogRow> = self.client.insert(&self.config.table).await?;

        for row in rows {
            insert.write(row).await?;
        }

        insert.end().await?;
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for ClickHouseBackend {
    fn name(&self) -> &'static str {
        "clickhouse"
    }

    async fn ensure_partition(&self, for_date: DateTime<Utc>) -> Result<(), StorageError> {
        let key = partition_key(for_date);
        if self.is_verified(&key) {
            return Ok(());
        }

        match self.table_exists().await {
            Ok(true) => {
                tracing::debug!(table = %self.config.table, partition = %key, "partition target verified");
                self.verified.lock().insert(key);
                Ok(())
            }
            Ok(false) => Err(StorageError::partition(
                key,
                ClickHouseError::MissingTable(self.config.qualified_table()).to_string(),
            )),
            Err(e) => Err(StorageError::partition(key, e.to_string())),
        }
    }

    async fn bulk_insert(&self, records: &[Record]) -> Result<(), StorageError> {
        if records.is_empty() {
            return Ok(());
        }

        let rows: Vec<LogRow> = records.iter().map(LogRow::from).collect();
        self.do_insert(&rows).await?;

        tracing::debug!(table = %self.config.table, count = rows.len(), "inserted logs");
        Ok(())
    }
}

/// Accept only names that are safe to splice into SQL
pub(crate) fn validate_identifier(field: &str, name: &str) -> Result<(), ClickHouseError> {
    let valid = !name.is_empty()
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit());
    if valid {
        Ok(())
    } else {
        Err(ClickHouseError::Config(format!(
            "{field} name '{name}' must contain only letters, digits and underscores"
        )))
    }
}

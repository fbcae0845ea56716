//! Configuration validation
//!
//! Validates config consistency:
//! - Buffer sizes and durations are non-zero
//! - Required fields are present for the selected storage backend

use std::time::Duration;

use crate::Config;
use crate::error::{ConfigError, Result};
use crate::storage::StorageKind;

/// Validate the entire configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_buffer(config)?;
    validate_storage(config)?;
    Ok(())
}

fn validate_buffer(config: &Config) -> Result<()> {
    let buffer = &config.buffer;

    if buffer.batch_size == 0 {
        return Err(ConfigError::invalid_value(
            "buffer",
            "batch_size",
            "must be greater than 0",
        ));
    }
    if buffer.drain_max_attempts == 0 {
        return Err(ConfigError::invalid_value(
            "buffer",
            "drain_max_attempts",
            "must be greater than 0",
        ));
    }
    non_zero("flush_interval", buffer.flush_interval)?;
    non_zero("persist_timeout", buffer.persist_timeout)?;

    Ok(())
}

fn non_zero(field: &'static str, value: Duration) -> Result<()> {
    if value.is_zero() {
        return Err(ConfigError::invalid_value(
            "buffer",
            field,
            "must be greater than 0",
        ));
    }
    Ok(())
}

fn validate_storage(config: &Config) -> Result<()> {
    if config.storage.backend != StorageKind::Clickhouse {
        return Ok(());
    }

    let ch = &config.storage.clickhouse;
    if ch.url.is_empty() {
        return Err(ConfigError::missing_field("storage.clickhouse", "url"));
    }
    if !ch.url.starts_with("http://") && !ch.url.starts_with("https://") {
        return Err(ConfigError::invalid_value(
            "storage.clickhouse",
            "url",
            "must start with http:// or https://",
        ));
    }
    if ch.table.is_empty() {
        return Err(ConfigError::missing_field("storage.clickhouse", "table"));
    }

    Ok(())
}

//! Storage configuration
//!
//! Selects the backend the buffer flushes to.

use serde::Deserialize;

/// Which storage backend to flush to
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// Keep flushed records in process memory (default)
    #[default]
    Memory,
    /// Monthly-partitioned ClickHouse table
    Clickhouse,
}

/// Storage configuration
///
/// # Example
///
/// ```toml
/// [storage]
/// backend = "clickhouse"
///
/// [storage.clickhouse]
/// url = "http://localhost:8123"
/// database = "default"
/// table = "logs"
/// ```
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StorageSection {
    /// Backend selection
    /// Default: memory
    pub backend: StorageKind,

    /// ClickHouse connection settings
    pub clickhouse: ClickHouseSection,
}

/// ClickHouse connection settings
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClickHouseSection {
    /// HTTP endpoint, e.g. `http://localhost:8123`
    /// Required when `backend = "clickhouse"`
    pub url: String,

    /// Database name
    /// Default: default
    pub database: String,

    /// Username
    pub username: Option<String>,

    /// Password
    pub password: Option<String>,

    /// Target table
    /// Default: logs
    pub table: String,
}

impl Default for ClickHouseSection {
    fn default() -> Self {
        Self {
            url: String::new(),
            database: "default".into(),
            username: None,
            password: None,
            table: "logs".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: StorageSection = toml::from_str("").unwrap();
        assert_eq!(config.backend, StorageKind::Memory);
        assert_eq!(config.clickhouse.database, "default");
        assert_eq!(config.clickhouse.table, "logs");
        assert!(config.clickhouse.url.is_empty());
    }

    #[test]
    fn test_clickhouse_section() {
        let toml = r#"
backend = "clickhouse"

[clickhouse]
url = "http://ch:8123"
database = "spool"
username = "writer"
password = "secret"
"#;
        let config: StorageSection = toml::from_str(toml).unwrap();
        assert_eq!(config.backend, StorageKind::Clickhouse);
        assert_eq!(config.clickhouse.url, "http://ch:8123");
        assert_eq!(config.clickhouse.database, "spool");
        assert_eq!(config.clickhouse.username.as_deref(), Some("writer"));
        assert_eq!(config.clickhouse.table, "logs");
    }

    #[test]
    fn test_unknown_backend_rejected() {
        assert!(toml::from_str::<StorageSection>("backend = \"postgres\"").is_err());
    }
}

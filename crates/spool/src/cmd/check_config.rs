//! Check-config command - print the effective configuration

use anyhow::Result;
use spool_config::{Config, StorageKind};

/// Run the check-config command
///
/// Loading already validated the config; this reports what will be used.
pub fn run(config: &Config) -> Result<()> {
    print!("{}", render(config));
    Ok(())
}

fn render(config: &Config) -> String {
    let buffer = &config.buffer;
    let mut out = String::from("configuration OK\n\n[buffer]\n");
    out.push_str(&format!("  batch_size          {}\n", buffer.batch_size));
    out.push_str(&format!("  flush_interval      {:?}\n", buffer.flush_interval));
    out.push_str(&format!("  max_retries         {}\n", buffer.max_retries));
    out.push_str(&format!("  persist_timeout     {:?}\n", buffer.persist_timeout));
    out.push_str(&format!("  drain_max_attempts  {}\n", buffer.drain_max_attempts));
    out.push_str(&format!("  drain_poll_interval {:?}\n", buffer.drain_poll_interval));
    out.push_str(&format!("  shutdown_wait       {:?}\n", buffer.shutdown_wait));

    out.push_str("\n[storage]\n");
    match config.storage.backend {
        StorageKind::Memory => out.push_str("  backend             memory\n"),
        StorageKind::Clickhouse => {
            let ch = &config.storage.clickhouse;
            out.push_str("  backend             clickhouse\n");
            out.push_str(&format!("  url                 {}\n", ch.url));
            out.push_str(&format!("  table               {}.{}\n", ch.database, ch.table));
        }
    }

    out.push_str("\n[log]\n");
    out.push_str(&format!("  level               {}\n", config.log.level));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_memory() {
        let out = render(&Config::default());
        assert!(out.starts_with("configuration OK"));
        assert!(out.contains("batch_size          1000"));
        assert!(out.contains("backend             memory"));
        assert!(!out.contains("url"));
    }

    #[test]
    fn test_render_clickhouse_hides_credentials() {
        let mut config = Config::default();
        config.storage.backend = StorageKind::Clickhouse;
        config.storage.clickhouse.url = "http://ch:8123".into();
        config.storage.clickhouse.password = Some("secret".into());

        let out = render(&config);
        assert!(out.contains("http://ch:8123"));
        assert!(out.contains("default.logs"));
        assert!(!out.contains("secret"));
    }
}

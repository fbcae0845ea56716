//! Command implementations for the Spool CLI

pub mod check_config;
pub mod run;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use spool_config::Config;

/// Load configuration, then apply environment overrides
///
/// An explicit path must exist. Without one, `configs/spool.toml` and
/// `spool.toml` are tried before falling back to defaults.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => {
            if !path.exists() {
                return Err(anyhow::anyhow!("config file not found: {}", path.display()));
            }
            Config::from_file(path).context("failed to load configuration")?
        }
        None => {
            let default_paths = [PathBuf::from("configs/spool.toml"), PathBuf::from("spool.toml")];
            match default_paths.iter().find(|p| p.exists()) {
                Some(path) => Config::from_file(path).context("failed to load configuration")?,
                None => Config::default(),
            }
        }
    };

    config
        .with_env()
        .context("invalid environment override")
}

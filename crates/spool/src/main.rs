//! Spool - Buffered log ingestion
//!
//! # Usage
//!
//! ```bash
//! # Buffer newline-delimited JSON records from stdin (default)
//! spool run < logs.jsonl
//! spool run --config configs/spool.toml --input logs.jsonl
//!
//! # Validate a configuration file
//! spool check-config --config configs/spool.toml
//! ```

mod cmd;

use anyhow::Result;
use clap::{Parser, Subcommand};
use spool_config::LogFormat;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Spool - buffered log ingestion with batched flushes
#[derive(Parser, Debug)]
#[command(name = "spool")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (error if specified but not found)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Log level (trace, debug, info, warn, error). Overrides config file.
    #[arg(short, long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ingest records until EOF or a shutdown signal
    Run(cmd::run::RunArgs),

    /// Validate configuration and print the effective settings
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cmd::load_config(cli.config.as_deref())?;

    match cli.command {
        Some(Command::CheckConfig) => {
            // Prints to stdout; no logging needed
            cmd::check_config::run(&config)
        }
        Some(Command::Run(args)) => {
            let level = resolve_log_level(cli.log_level.as_deref(), &config);
            init_logging(&level, config.log.format)?;
            cmd::run::run(args, config).await
        }
        // No subcommand = ingest from stdin
        None => {
            let level = resolve_log_level(cli.log_level.as_deref(), &config);
            init_logging(&level, config.log.format)?;
            cmd::run::run(cmd::run::RunArgs::default(), config).await
        }
    }
}

/// Resolve log level: CLI flag > config file (and LOG_LEVEL) > default "info"
fn resolve_log_level(cli_level: Option<&str>, config: &spool_config::Config) -> String {
    match cli_level {
        Some(level) => level.to_string(),
        None => config.log.level.as_str().to_string(),
    }
}

/// Initialize the tracing subscriber for logging
///
/// Logs go to stderr; stdout carries command output.
fn init_logging(level: &str, format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Console => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_current_span(false),
            )
            .init(),
    }

    Ok(())
}

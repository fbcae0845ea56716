//! Run command - buffer newline-delimited JSON records into storage
//!
//! Reads records from a file or stdin, stages each one with `add_log`, and on
//! EOF or SIGINT/SIGTERM closes the buffer and prints final statistics.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{error, info, warn};

use spool_buffer::{BufferConfig, LogBuffer, RawRecord, StorageBackend};
use spool_config::{BufferSection, Config, StorageKind, StorageSection};
use spool_storage::{ClickHouseBackend, ClickHouseConfig, MemoryBackend};

/// Run command arguments
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Newline-delimited JSON input ("-" or omitted for stdin)
    #[arg(short, long)]
    pub input: Option<PathBuf>,
}

/// Lines read from the input
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    pub accepted: u64,
    pub rejected: u64,
}

/// Run the run command
pub async fn run(args: RunArgs, config: Config) -> Result<()> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        backend = ?config.storage.backend,
        batch_size = config.buffer.batch_size,
        "Spool starting"
    );

    let backend = build_backend(&config.storage)?;
    let buffer = LogBuffer::new(buffer_config(&config.buffer), backend);
    buffer.open().context("failed to start log buffer")?;

    let reader = open_input(args.input.as_deref()).await?;
    let mut summary = IngestSummary::default();
    let outcome = tokio::select! {
        result = ingest(reader, &buffer, &mut summary) => result,
        _ = wait_for_shutdown() => {
            info!("shutdown signal received");
            Ok(())
        }
    };
    if let Err(ref e) = outcome {
        error!(error = %e, "input failed, shutting down");
    }

    let close = buffer.close().await;
    let report = serde_json::json!({
        "ingest": summary,
        "close": close,
        "stats": buffer.get_stats(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    info!(
        accepted = summary.accepted,
        rejected = summary.rejected,
        "Spool shutdown complete"
    );
    outcome
}

/// Build the storage backend selected in config
pub fn build_backend(storage: &StorageSection) -> Result<Arc<dyn StorageBackend>> {
    match storage.backend {
        StorageKind::Memory => Ok(Arc::new(MemoryBackend::new())),
        StorageKind::Clickhouse => {
            let ch = &storage.clickhouse;
            let mut config = ClickHouseConfig::default()
                .with_url(&ch.url)
                .with_database(&ch.database)
                .with_table(&ch.table);
            config.username = ch.username.clone();
            config.password = ch.password.clone();

            let backend = ClickHouseBackend::new(config).context("invalid clickhouse settings")?;
            Ok(Arc::new(backend))
        }
    }
}

/// Map the `[buffer]` section onto the buffer's runtime config
pub fn buffer_config(section: &BufferSection) -> BufferConfig {
    BufferConfig::default()
        .with_batch_size(section.batch_size)
        .with_flush_interval(section.flush_interval)
        .with_max_retries(section.max_retries)
        .with_persist_timeout(section.persist_timeout)
        .with_drain_max_attempts(section.drain_max_attempts)
        .with_drain_poll_interval(section.drain_poll_interval)
        .with_shutdown_wait(section.shutdown_wait)
}

async fn open_input(path: Option<&Path>) -> Result<Box<dyn AsyncBufRead + Unpin + Send>> {
    match path {
        None => Ok(Box::new(BufReader::new(tokio::io::stdin()))),
        Some(p) if p == Path::new("-") => Ok(Box::new(BufReader::new(tokio::io::stdin()))),
        Some(p) => {
            let file = tokio::fs::File::open(p)
                .await
                .with_context(|| format!("failed to open input {}", p.display()))?;
            Ok(Box::new(BufReader::new(file)))
        }
    }
}

/// Stage every well-formed line of `reader`
///
/// Blank lines are skipped. Lines that are not a JSON record with a non-empty
/// `type` and `message` are counted as rejected and logged.
pub async fn ingest<R>(reader: R, buffer: &LogBuffer, summary: &mut IngestSummary) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut line_no: u64 = 0;

    while let Some(line) = lines.next_line().await.context("failed to read input")? {
        line_no += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match parse_record(line) {
            Ok(raw) => {
                buffer.add_log(raw);
                summary.accepted += 1;
            }
            Err(reason) => {
                warn!(line = line_no, reason = %reason, "rejected input line");
                summary.rejected += 1;
            }
        }
    }

    info!(lines = line_no, accepted = summary.accepted, "input exhausted");
    Ok(())
}

fn parse_record(line: &str) -> std::result::Result<RawRecord, String> {
    let raw: RawRecord = serde_json::from_str(line).map_err(|e| e.to_string())?;
    if raw.kind.trim().is_empty() {
        return Err("missing type".into());
    }
    if raw.message.trim().is_empty() {
        return Err("missing message".into());
    }
    Ok(raw)
}

/// Resolves on SIGINT or SIGTERM
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
#[path = "run_test.rs"]
mod run_test;

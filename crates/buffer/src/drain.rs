//! Drain controller
//!
//! Repeated flush attempts that try to empty the staging queue, bounded by an
//! attempt budget. Shared by the operator "flush now" path and shutdown.

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::buffer::Shared;
use crate::error::Result;
use crate::flusher::{FlushOutcome, SkipReason};

/// Summary of one drain
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    /// Attempts used, including polls while another flush was running
    pub attempts: u32,
    /// Records persisted during the drain
    pub flushed: usize,
    /// Records still staged afterwards
    pub remaining: usize,
}

impl Shared {
    /// Flush until the queue is empty or the attempt budget runs out
    ///
    /// Partition failures abort the drain and propagate to the caller.
    pub(crate) async fn drain(&self) -> Result<DrainReport> {
        let max_attempts = self.config.drain_max_attempts;
        let poll = self.config.drain_poll_interval;
        let mut report = DrainReport::default();

        while !self.queue.is_empty() && report.attempts < max_attempts {
            report.attempts += 1;

            if self.is_processing() {
                debug!(attempt = report.attempts, "flush in progress, waiting");
                tokio::time::sleep(poll).await;
                continue;
            }

            match self.flush().await? {
                FlushOutcome::Committed { count, .. } => report.flushed += count,
                FlushOutcome::Skipped(SkipReason::Busy) => tokio::time::sleep(poll).await,
                FlushOutcome::Skipped(SkipReason::Empty) | FlushOutcome::RolledBack { .. } => {}
            }
        }

        report.remaining = self.queue.len();
        if report.remaining > 0 {
            warn!(
                attempts = report.attempts,
                flushed = report.flushed,
                remaining = report.remaining,
                "drain stopped with records still buffered"
            );
        } else if report.attempts > 0 {
            info!(
                attempts = report.attempts,
                flushed = report.flushed,
                "drain complete"
            );
        }
        Ok(report)
    }

    /// Wait until no flush is running, up to `wait`
    ///
    /// Returns false if a flush was still running when the wait expired.
    pub(crate) async fn wait_idle(&self, wait: Duration) -> bool {
        let poll = self.config.drain_poll_interval;
        let idle = tokio::time::timeout(wait, async {
            while self.is_processing() {
                tokio::time::sleep(poll).await;
            }
        })
        .await;
        idle.is_ok()
    }
}

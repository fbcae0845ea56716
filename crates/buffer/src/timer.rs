//! Flush timer
//!
//! Recurring task that asks the buffer to flush every `flush_interval`. It holds
//! only a weak reference to the buffer, and is stopped through its
//! cancellation token.

use std::sync::Weak;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::buffer::Shared;
use crate::flusher::FlushOutcome;

/// Handle to a running flush timer
#[derive(Debug)]
pub(crate) struct FlushTimer {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl FlushTimer {
    /// Spawn the timer task on the current runtime
    pub(crate) fn spawn(handle: &tokio::runtime::Handle, period: Duration, shared: Weak<Shared>) -> Self {
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let handle = handle.spawn(run(period, shared, task_cancel));
        Self { cancel, handle }
    }

    /// Cancel the task and wait for it to exit, up to `wait`
    ///
    /// A tick that is mid-flush finishes that flush before exiting.
    pub(crate) async fn stop(self, wait: Duration) {
        self.cancel.cancel();
        match tokio::time::timeout(wait, self.handle).await {
            Ok(Ok(())) => debug!("flush timer stopped"),
            Ok(Err(e)) => warn!(error = %e, "flush timer task failed"),
            Err(_) => warn!(
                wait_ms = wait.as_millis(),
                "flush timer did not stop in time, detaching"
            ),
        }
    }
}

async fn run(period: Duration, shared: Weak<Shared>, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let Some(shared) = shared.upgrade() else {
                    break;
                };
                tick(&shared).await;
            }
        }
    }
}

/// One timer tick; errors are logged and never end the loop
async fn tick(shared: &Shared) {
    match shared.flush().await {
        Ok(FlushOutcome::Skipped(reason)) => {
            debug!(reason = ?reason, "scheduled flush skipped");
        }
        Ok(_) => {}
        Err(e) => {
            shared.failure_log.error("scheduled flush", &e);
        }
    }
}

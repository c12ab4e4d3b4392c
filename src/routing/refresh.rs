//! Background route table refresh.
//!
//! # Triggers
//! - Periodic tick (`routing.refresh_interval_secs`, 0 disables)
//! - Explicit request through the shared `Notify` (catalog watcher)
//! - Retry with exponential backoff after a failed rebuild
//!
//! Exits on the shutdown broadcast.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, Notify};

use crate::resilience::backoff::calculate_backoff;
use crate::routing::builder::Reloader;

pub struct RefreshLoop {
    reloader: Arc<Reloader>,
    interval: Option<Duration>,
    trigger: Arc<Notify>,
    retry_base_ms: u64,
    retry_max_ms: u64,
}

impl RefreshLoop {
    pub fn new(reloader: Arc<Reloader>, interval: Option<Duration>, trigger: Arc<Notify>) -> Self {
        Self {
            reloader,
            interval,
            trigger,
            retry_base_ms: 500,
            retry_max_ms: 10_000,
        }
    }

    /// Override the backoff used after failed rebuilds.
    pub fn with_retry_backoff(mut self, base_ms: u64, max_ms: u64) -> Self {
        self.retry_base_ms = base_ms;
        self.retry_max_ms = max_ms;
        self
    }

    fn next_wait(&self, failures: u32) -> Option<Duration> {
        if failures > 0 {
            let backoff = calculate_backoff(failures, self.retry_base_ms, self.retry_max_ms);
            Some(match self.interval {
                Some(interval) => backoff.min(interval),
                None => backoff,
            })
        } else {
            self.interval
        }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval = ?self.interval,
            "Route refresh loop starting"
        );

        let mut failures: u32 = 0;
        loop {
            let wait = self.next_wait(failures);

            tokio::select! {
                _ = tokio::time::sleep(wait.unwrap_or_default()), if wait.is_some() => {
                    tracing::debug!(failures, "Refresh tick");
                }
                _ = self.trigger.notified() => {
                    tracing::debug!("Refresh requested");
                }
                _ = shutdown.recv() => {
                    tracing::info!("Refresh loop received shutdown signal, exiting loop");
                    break;
                }
            }

            match self.reloader.reload().await {
                Ok(_) => failures = 0,
                Err(_) => failures = failures.saturating_add(1),
            }
        }
    }
}

//! Background eviction of expired verdicts.
//!
//! [`CacheSweeper`] owns a tokio task that calls [`VerdictCache::sweep`] on a
//! fixed interval. The task lives exactly as long as the handle: call
//! [`CacheSweeper::shutdown`] for an orderly stop, or drop the handle to
//! abort it.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::cache::VerdictCache;
use crate::constants::{DEFAULT_SWEEP_INTERVAL, MAX_SWEEP_INTERVAL};

/// Handle to a running sweep task.
#[derive(Debug)]
pub struct CacheSweeper {
    shutdown_tx: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
    period: Duration,
}

impl CacheSweeper {
    /// Spawn a sweep task on the current tokio runtime.
    ///
    /// The first sweep runs one `period` after spawning. A zero period
    /// falls back to [`DEFAULT_SWEEP_INTERVAL`]; periods above
    /// [`MAX_SWEEP_INTERVAL`] are clamped to it.
    pub fn spawn(cache: Arc<VerdictCache>, period: Duration) -> Self {
        let period = if period.is_zero() {
            DEFAULT_SWEEP_INTERVAL
        } else {
            period.min(MAX_SWEEP_INTERVAL)
        };
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(sweep_loop(cache, period, shutdown_rx));

        tracing::debug!(period_secs = period.as_secs(), "Cache sweeper started");

        Self {
            shutdown_tx,
            handle: Some(handle),
            period,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// True until the task has exited.
    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Signal the task to stop and wait for it to exit.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Cache sweeper exited abnormally");
            }
        }
        tracing::debug!("Cache sweeper stopped");
    }
}

impl Drop for CacheSweeper {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

async fn sweep_loop(
    cache: Arc<VerdictCache>,
    period: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let now = Instant::now();
    let start = now.checked_add(period).unwrap_or(now);
    let mut ticker = interval_at(start, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let removed = cache.sweep(Utc::now());
                if removed > 0 {
                    tracing::debug!(removed, remaining = cache.len(), "Swept expired verdicts");
                }
            }
            changed = shutdown_rx.changed() => {
                // Sender dropped or shutdown requested.
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
        }
    }
}

//! Periodic refresh scheduler
//!
//! Runs a collection cycle immediately, then one cycle per interval until
//! shut down. A cycle that panics, or that refreshed nothing, is followed by
//! the error backoff instead of the regular interval. The shutdown signal is
//! checked before sleeping and interrupts the sleep itself.

use crate::{collector::Collector, config::HubConfig, types::CycleStatus};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Lifecycle of the scheduler task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Created, no cycle started yet
    Idle,
    /// A cycle is in progress
    Running,
    /// Waiting for the next cycle
    Sleeping,
    /// Shut down
    Stopped,
}

/// Drives a [`Collector`] on a fixed interval
pub struct Scheduler {
    collector: Arc<Collector>,
    interval: Duration,
    error_backoff: Duration,
}

impl Scheduler {
    /// Creates a scheduler using the interval and backoff from `config`
    pub fn new(collector: Arc<Collector>, config: &HubConfig) -> Self {
        Self::with_intervals(collector, config.collection_interval, config.error_backoff)
    }

    pub fn with_intervals(
        collector: Arc<Collector>,
        interval: Duration,
        error_backoff: Duration,
    ) -> Self {
        Self {
            collector,
            interval,
            error_backoff,
        }
    }

    /// Spawns the scheduler loop on the current runtime
    ///
    /// Dropping the returned handle also stops the loop once the current
    /// cycle (if any) finishes.
    pub fn start(self) -> SchedulerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (state_tx, state_rx) = watch::channel(SchedulerState::Idle);
        let cycles = Arc::new(AtomicU64::new(0));

        let task = tokio::spawn(self.run(shutdown_rx, state_tx, cycles.clone()));

        SchedulerHandle {
            shutdown_tx,
            state_rx,
            cycles,
            task,
        }
    }

    async fn run(
        self,
        mut shutdown_rx: watch::Receiver<bool>,
        state_tx: watch::Sender<SchedulerState>,
        cycles: Arc<AtomicU64>,
    ) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            error_backoff_secs = self.error_backoff.as_secs(),
            "Starting data collection scheduler"
        );

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            state_tx.send_replace(SchedulerState::Running);
            let delay = self.run_cycle().await;
            cycles.fetch_add(1, Ordering::SeqCst);

            if *shutdown_rx.borrow() {
                break;
            }

            state_tx.send_replace(SchedulerState::Sleeping);
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                // Err means every handle is gone, which also means stop
                _ = shutdown_rx.changed() => break,
            }
        }

        state_tx.send_replace(SchedulerState::Stopped);
        tracing::info!("Data collection scheduler stopped");
    }

    /// Runs one cycle in its own task and picks the delay before the next one
    async fn run_cycle(&self) -> Duration {
        let collector = self.collector.clone();
        match tokio::spawn(async move { collector.run_cycle().await }).await {
            Ok(report) if report.status() == CycleStatus::Failed => {
                tracing::warn!(
                    backoff_secs = self.error_backoff.as_secs(),
                    "No dataset refreshed this cycle, backing off"
                );
                self.error_backoff
            }
            Ok(_) => self.interval,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    backoff_secs = self.error_backoff.as_secs(),
                    "Collection cycle aborted, backing off"
                );
                self.error_backoff
            }
        }
    }
}

/// Control handle for a running scheduler
pub struct SchedulerHandle {
    shutdown_tx: watch::Sender<bool>,
    state_rx: watch::Receiver<SchedulerState>,
    cycles: Arc<AtomicU64>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Current lifecycle state
    pub fn state(&self) -> SchedulerState {
        *self.state_rx.borrow()
    }

    /// Number of cycles that finished (successfully or not)
    pub fn cycles_completed(&self) -> u64 {
        self.cycles.load(Ordering::SeqCst)
    }

    /// Signals shutdown and waits for the loop to exit
    ///
    /// A sleeping scheduler wakes immediately; a running cycle is allowed to
    /// finish first.
    pub async fn shutdown(self) {
        self.shutdown_tx.send_replace(true);
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Scheduler task ended abnormally");
        }
    }
}

//! Fixed-interval reconciliation scheduler

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::reconcile::PriceReconciler;

/// Scheduler configuration
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub interval: Duration,
    /// Run a cycle as soon as the scheduler starts
    pub run_immediately: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(15 * 60),
            run_immediately: true,
        }
    }
}

/// Counters shared with the background task
#[derive(Debug, Default)]
pub struct SchedulerStats {
    cycles: AtomicU64,
    failures: AtomicU64,
}

impl SchedulerStats {
    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}

/// Triggers a reconciliation cycle every interval
pub struct ReconcileScheduler {
    config: SchedulerConfig,
    reconciler: Arc<PriceReconciler>,
    stats: Arc<SchedulerStats>,
    handle: Option<JoinHandle<()>>,
    shutdown: Option<watch::Sender<bool>>,
}

impl ReconcileScheduler {
    pub fn new(config: SchedulerConfig, reconciler: Arc<PriceReconciler>) -> Self {
        Self {
            config,
            reconciler,
            stats: Arc::new(SchedulerStats::default()),
            handle: None,
            shutdown: None,
        }
    }

    pub fn stats(&self) -> Arc<SchedulerStats> {
        Arc::clone(&self.stats)
    }

    /// Start the background task. Calling it twice is a no-op.
    pub fn start(&mut self) {
        if self.handle.is_some() {
            return;
        }

        info!(
            "Starting price scheduler: {} sources every {:?}",
            self.reconciler.source_count(),
            self.config.interval
        );

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let reconciler = Arc::clone(&self.reconciler);
        let stats = Arc::clone(&self.stats);
        let config = self.config.clone();

        self.handle = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(config.interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            if !config.run_immediately {
                interval.tick().await;
            }

            loop {
                // only the wait is interruptible; a started cycle always completes
                tokio::select! {
                    _ = interval.tick() => {}
                    _ = shutdown_rx.changed() => break,
                }

                stats.cycles.fetch_add(1, Ordering::Relaxed);
                // failures are logged by the reconciler; the next tick is the retry
                if let Err(e) = reconciler.reconcile().await {
                    stats.failures.fetch_add(1, Ordering::Relaxed);
                    debug!("Scheduled cycle skipped: {}", e);
                }
            }
        }));
        self.shutdown = Some(shutdown_tx);
    }

    /// Stop after the cycle in progress, if any, has finished
    pub async fn stop(&mut self) {
        info!("Stopping price scheduler");

        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(true);
        }
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!("Price scheduler task ended abnormally: {}", e);
            }
        }
    }

    /// True while the background task is alive
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

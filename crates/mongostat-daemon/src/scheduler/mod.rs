//! Interval-driven collection cycles

use mongostat_collector::Cycle;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{interval, Duration, MissedTickBehavior};

/// Runs a collection cycle on a fixed interval
pub struct Scheduler {
    cycle: Arc<Cycle>,
    period: Duration,
    stop_tx: watch::Sender<bool>,
    running: AtomicBool,
}

impl Scheduler {
    /// Create a new scheduler
    pub fn new(cycle: Arc<Cycle>, period: Duration) -> Arc<Self> {
        let (stop_tx, _) = watch::channel(false);
        Arc::new(Self {
            cycle,
            period,
            stop_tx,
            running: AtomicBool::new(false),
        })
    }

    /// Run cycles until [`stop`](Self::stop) is called. The first cycle runs immediately.
    ///
    /// A stop requested before the loop starts is honored; the loop never runs.
    pub async fn start(self: Arc<Self>) {
        let mut stop_rx = self.stop_tx.subscribe();
        if *stop_rx.borrow_and_update() {
            return;
        }
        self.running.store(true, Ordering::SeqCst);

        tracing::info!(interval = ?self.period, "Scheduler started");

        let mut ticker = interval(self.period);
        // A cycle slower than the period delays the next one instead of bunching up.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = stop_rx.changed() => break,
            }
            if *stop_rx.borrow() {
                break;
            }

            let report = self.cycle.run_once().await;
            if report.failed > 0 {
                tracing::warn!(
                    exported = report.exported,
                    failed = report.failed,
                    "Collection cycle finished with failures"
                );
            }
        }

        self.running.store(false, Ordering::SeqCst);
        tracing::info!("Scheduler stopped");
    }

    /// Stop the scheduler; an in-flight cycle finishes first
    pub fn stop(&self) {
        self.stop_tx.send_replace(true);
    }

    /// Whether the loop is active
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

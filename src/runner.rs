//! Host-side periodic diagnostics.
//!
//! # Responsibilities
//! - Re-run diagnostics on a fixed interval
//! - Stop cleanly when the shutdown signal fires
//!
//! # Design Decisions
//! - The first run happens immediately
//! - A tick that fires while a run is in flight is delayed, not queued up

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{self, MissedTickBehavior};

use crate::collector::Collector;
use crate::health::state::ServiceMap;

/// Broadcast shutdown coordinator.
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

pub struct PeriodicRunner {
    collector: Arc<Collector>,
    interval: Duration,
}

impl PeriodicRunner {
    pub fn new(collector: Arc<Collector>, interval: Duration) -> Self {
        Self { collector, interval }
    }

    /// Run until shutdown, calling `on_run` after every completed pass.
    /// Returns the number of completed passes.
    pub async fn run<F>(self, mut shutdown: broadcast::Receiver<()>, mut on_run: F) -> usize
    where
        F: FnMut(&ServiceMap),
    {
        tracing::info!(interval_secs = self.interval.as_secs_f64(), "Diagnostics runner starting");

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut runs = 0;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let services = self.collector.run_diagnostics().await;
                    runs += 1;
                    on_run(&services);
                }
                _ = shutdown.recv() => {
                    tracing::info!(runs, "Diagnostics runner received shutdown signal, exiting loop");
                    break;
                }
            }
        }
        runs
    }
}

//! Background maintenance: the periodic promotion sweep and retrain.
//!
//! Each job runs on its own tokio task with its own interval. The first run
//! happens one full period after start. A retrain tick that finds another
//! retrain in progress is skipped.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::ScheduleConfig;
use crate::engine::Engine;

pub struct Scheduler {
    engine: Arc<Engine>,
    validate_interval: Duration,
    retrain_interval: Duration,
    shutdown_tx: broadcast::Sender<()>,
}

impl Scheduler {
    pub fn new(engine: Arc<Engine>, config: &ScheduleConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            engine,
            validate_interval: config.validate_interval(),
            retrain_interval: config.retrain_interval(),
            shutdown_tx,
        }
    }

    /// Spawn the validate and retrain tasks.
    ///
    /// Shutdown receivers are subscribed here, before spawning, so a
    /// `shutdown()` that races the first poll still reaches both tasks.
    pub fn start(self: Arc<Self>) -> Vec<JoinHandle<()>> {
        let validate = Arc::clone(&self);
        let validate_rx = self.shutdown_tx.subscribe();
        let retrain = Arc::clone(&self);
        let retrain_rx = self.shutdown_tx.subscribe();
        vec![
            tokio::spawn(async move { validate.run_validate(validate_rx).await }),
            tokio::spawn(async move { retrain.run_retrain(retrain_rx).await }),
        ]
    }

    /// Signal both tasks to stop after their current run.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    async fn run_validate(&self, mut shutdown_rx: broadcast::Receiver<()>) {
        let mut ticker = interval_at(Instant::now() + self.validate_interval, self.validate_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let promoted = self.engine.validate().await;
                    if !promoted.is_empty() {
                        info!(count = promoted.len(), "promotion sweep finished");
                    }
                }
                _ = shutdown_rx.recv() => {
                    debug!("validate task stopping");
                    break;
                }
            }
        }
    }

    async fn run_retrain(&self, mut shutdown_rx: broadcast::Receiver<()>) {
        let mut ticker = interval_at(Instant::now() + self.retrain_interval, self.retrain_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.engine.try_retrain().await {
                        Some(Ok(_)) | None => {}
                        Some(Err(e)) => {
                            warn!(error = %e, "scheduled retrain failed, keeping previous model");
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    debug!("retrain task stopping");
                    break;
                }
            }
        }
    }
}

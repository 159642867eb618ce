//! Countdown ticker background task

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use chrono::Utc;
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tracing::{debug, error, info, warn};

use crate::state::AppState;

/// Owner of a running ticker. Dropping it stops the ticks.
pub struct TickerHandle {
    cancelled: Arc<AtomicBool>,
    stop_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl TickerHandle {
    /// Stop ticking. No tick starts after this returns.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.stop_tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Cancel and wait for the task to exit, including any tick in progress
    pub async fn shutdown(mut self) {
        self.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Ticker task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for TickerHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Spawn the task that advances all running timers once per `period`
pub fn spawn_ticker(state: Arc<AppState>, period: Duration) -> TickerHandle {
    let cancelled = Arc::new(AtomicBool::new(false));
    let (stop_tx, stop_rx) = watch::channel(false);
    let task = tokio::spawn(ticker_task(state, period, Arc::clone(&cancelled), stop_rx));

    TickerHandle {
        cancelled,
        stop_tx,
        task: Some(task),
    }
}

async fn ticker_task(
    state: Arc<AppState>,
    period: Duration,
    cancelled: Arc<AtomicBool>,
    mut stop_rx: watch::Receiver<bool>,
) {
    info!("Starting ticker task ({}ms period)", period.as_millis());

    // First tick one full period from now; a slow tick delays the next instead of bursting
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            _ = stop_rx.changed() => break,

            _ = interval.tick() => {
                if cancelled.load(Ordering::SeqCst) {
                    break;
                }
                match state.tick(Utc::now()) {
                    Ok(report) if report.changed => {
                        debug!("Tick applied: {} alert(s), {} completion(s)",
                               report.alerts.len(), report.completed.len());
                    }
                    Ok(_) => {}
                    Err(e) => error!("Tick failed: {}", e),
                }
            }
        }
    }

    info!("Ticker task stopped");
}

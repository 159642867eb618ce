//! Main application state management

use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::{Duration, Instant},
};
use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};

use crate::{
    error::{StoreError, TimerError},
    services::{Notifier, TimerStore},
    tasks::persistence_writer::{PersistenceWriter, StoreCommand},
};
use super::{
    engine::{TickReport, TimerEngine},
    events::EngineEvent,
    timer::{Category, HistoryRecord, Timer, TimerCommand, TimerDraft, TimerId},
};

/// Application state shared by the ticker, the persistence writer and the HTTP handlers
pub struct AppState {
    /// Authoritative timer collection
    engine: Mutex<TimerEngine>,
    notifier: Arc<dyn Notifier>,
    /// Queue feeding the persistence writer
    store_tx: mpsc::UnboundedSender<StoreCommand>,
    /// Alerts, completions and persistence failures
    pub event_tx: broadcast::Sender<EngineEvent>,
    /// Latest timer collection, republished after every change
    pub timers_tx: watch::Sender<Vec<Timer>>,
    pub start_time: Instant,
}

impl AppState {
    /// Load stored timers and create the state together with its persistence writer.
    ///
    /// A missing or unreadable timer collection starts the engine empty.
    pub fn new(
        store: Arc<dyn TimerStore>,
        notifier: Arc<dyn Notifier>,
        store_timeout: Duration,
    ) -> (Self, PersistenceWriter) {
        let stored = match store.load_timers() {
            Ok(timers) => timers,
            Err(e) => {
                warn!("Failed to load timers, starting empty: {}", e);
                Vec::new()
            }
        };
        let engine = TimerEngine::from_timers(stored);
        info!("Loaded {} timer(s) in {} categor(ies)",
              engine.timers().len(), engine.categories().len());

        let (store_tx, store_rx) = mpsc::unbounded_channel();
        let (event_tx, _) = broadcast::channel(100);
        let (timers_tx, _) = watch::channel(engine.timers().to_vec());

        let writer = PersistenceWriter::new(store_rx, store, event_tx.clone(), store_timeout);

        let state = Self {
            engine: Mutex::new(engine),
            notifier,
            store_tx,
            event_tx,
            timers_tx,
            start_time: Instant::now(),
        };
        (state, writer)
    }

    fn lock_engine(&self) -> Result<MutexGuard<'_, TimerEngine>, TimerError> {
        self.engine
            .lock()
            .map_err(|_| TimerError::StatePoisoned("timer engine"))
    }

    /// Run an update against the engine; when it reports a change, persist and publish the timers
    fn update_engine<F, R>(&self, updater: F) -> Result<R, TimerError>
    where
        F: FnOnce(&mut TimerEngine) -> Result<(R, bool), TimerError>,
    {
        let mut engine = self.lock_engine()?;
        let (result, changed) = updater(&mut *engine)?;
        let snapshot = changed.then(|| engine.timers().to_vec());
        drop(engine); // Release the lock before touching channels

        if let Some(timers) = snapshot {
            self.flush(timers);
        }
        Ok(result)
    }

    fn flush(&self, timers: Vec<Timer>) {
        self.enqueue(StoreCommand::SaveTimers(timers.clone()));
        self.timers_tx.send_replace(timers);
    }

    fn enqueue(&self, command: StoreCommand) {
        if let Err(e) = self.store_tx.send(command) {
            let operation = e.0.operation();
            error!("Failed to queue {}: {}", operation, StoreError::WriterClosed);
            self.emit(EngineEvent::PersistenceFailed {
                operation: operation.to_string(),
                message: StoreError::WriterClosed.to_string(),
            });
        }
    }

    fn emit(&self, event: EngineEvent) {
        if self.event_tx.send(event).is_err() {
            debug!("No event subscribers");
        }
    }

    /// Snapshot of all timers
    pub fn timers(&self) -> Result<Vec<Timer>, TimerError> {
        Ok(self.lock_engine()?.timers().to_vec())
    }

    pub fn timer(&self, id: TimerId) -> Result<Timer, TimerError> {
        self.lock_engine()?
            .get(id)
            .cloned()
            .ok_or(TimerError::NotFound(id))
    }

    /// Snapshot of the derived category view
    pub fn categories(&self) -> Result<Vec<Category>, TimerError> {
        Ok(self.lock_engine()?.categories().to_vec())
    }

    /// Validate and add a new idle timer
    pub fn add_timer(&self, draft: TimerDraft) -> Result<Timer, TimerError> {
        let timer = self.update_engine(|engine| Ok((engine.add(draft)?, true)))?;
        info!("Added timer {} '{}' ({}s, category '{}')",
              timer.id, timer.name, timer.duration, timer.category);
        Ok(timer)
    }

    /// Start, pause or reset a single timer
    pub fn apply_command(&self, id: TimerId, command: TimerCommand) -> Result<Timer, TimerError> {
        let timer = self.update_engine(|engine| {
            let before = engine.get(id).map(|t| (t.status, t.remaining_time));
            let timer = engine.apply(id, command)?;
            let changed = before != Some((timer.status, timer.remaining_time));
            Ok((timer, changed))
        })?;
        info!("Applied {} to timer {}: now {}", command, id, timer.status);
        Ok(timer)
    }

    /// Apply a command to every timer in a category
    pub fn bulk_action(&self, category: &str, command: TimerCommand) -> Result<usize, TimerError> {
        let changed = self.update_engine(|engine| {
            let changed = engine.bulk(category, command);
            Ok((changed, changed > 0))
        })?;
        info!("Bulk {} on category '{}' changed {} timer(s)", command, category, changed);
        Ok(changed)
    }

    /// Flip a category's expanded flag
    pub fn toggle_category(&self, name: &str) -> Result<Option<bool>, TimerError> {
        Ok(self.lock_engine()?.toggle_category(name))
    }

    /// Advance all running timers by one second and dispatch the resulting side effects
    pub fn tick(&self, now: DateTime<Utc>) -> Result<TickReport, TimerError> {
        let mut engine = self.lock_engine()?;
        let report = engine.tick(now);
        let snapshot = report.changed.then(|| engine.timers().to_vec());
        drop(engine);

        for alert in &report.alerts {
            self.notifier.notify(&alert.message());
            self.emit(EngineEvent::HalfwayAlert(alert.clone()));
        }
        for record in &report.completed {
            info!("Timer {} '{}' completed", record.id, record.timer_name);
            self.enqueue(StoreCommand::AppendHistory(record.clone()));
            self.emit(EngineEvent::TimerCompleted(record.clone()));
        }
        if let Some(timers) = snapshot {
            self.flush(timers);
        }

        Ok(report)
    }

    /// Read the completion log after every queued append has been written
    pub async fn load_history(&self) -> Result<Vec<HistoryRecord>, StoreError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.store_tx
            .send(StoreCommand::LoadHistory(reply_tx))
            .map_err(|_| StoreError::WriterClosed)?;
        reply_rx.await.map_err(|_| StoreError::WriterClosed)?
    }

    /// Empty the completion log
    pub async fn clear_history(&self) -> Result<(), StoreError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.store_tx
            .send(StoreCommand::ClearHistory(reply_tx))
            .map_err(|_| StoreError::WriterClosed)?;
        reply_rx.await.map_err(|_| StoreError::WriterClosed)??;
        info!("History cleared");
        Ok(())
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<EngineEvent> {
        self.event_tx.subscribe()
    }

    pub fn subscribe_timers(&self) -> watch::Receiver<Vec<Timer>> {
        self.timers_tx.subscribe()
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        let duration = self.start_time.elapsed();
        let hours = duration.as_secs() / 3600;
        let minutes = (duration.as_secs() % 3600) / 60;
        let seconds = duration.as_secs() % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }
}

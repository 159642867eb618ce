//! Persistence writer background task
//!
//! Single consumer of the store queue. Every store call runs on the blocking pool
//! under a timeout; failures are logged and broadcast, never retried. A call that
//! timed out keeps running, and the next call waits for it so writes land in queue order.

use std::{io, sync::Arc, time::Duration};
use tokio::{
    sync::{broadcast, mpsc, oneshot},
    task::{self, JoinHandle},
    time::timeout,
};
use tracing::{debug, error, info, warn};

use crate::{
    error::StoreError,
    services::TimerStore,
    state::{EngineEvent, HistoryRecord, Timer},
};

type Reply<T> = oneshot::Sender<Result<T, StoreError>>;

/// Work queued for the store
#[derive(Debug)]
pub enum StoreCommand {
    SaveTimers(Vec<Timer>),
    AppendHistory(HistoryRecord),
    LoadHistory(Reply<Vec<HistoryRecord>>),
    ClearHistory(Reply<()>),
}

impl StoreCommand {
    pub fn operation(&self) -> &'static str {
        match self {
            StoreCommand::SaveTimers(_) => "save_timers",
            StoreCommand::AppendHistory(_) => "append_history",
            StoreCommand::LoadHistory(_) => "load_history",
            StoreCommand::ClearHistory(_) => "clear_history",
        }
    }
}

pub struct PersistenceWriter {
    rx: mpsc::UnboundedReceiver<StoreCommand>,
    store: Arc<dyn TimerStore>,
    event_tx: broadcast::Sender<EngineEvent>,
    timeout: Duration,
    /// Store call that outlived its timeout and has not finished yet
    straggler: Option<JoinHandle<()>>,
}

impl PersistenceWriter {
    pub fn new(
        rx: mpsc::UnboundedReceiver<StoreCommand>,
        store: Arc<dyn TimerStore>,
        event_tx: broadcast::Sender<EngineEvent>,
        timeout: Duration,
    ) -> Self {
        Self { rx, store, event_tx, timeout, straggler: None }
    }

    /// Drain the queue until every sender is gone
    pub async fn run(mut self) {
        info!("Starting persistence writer");
        let mut deferred: Option<StoreCommand> = None;

        loop {
            let command = match deferred.take() {
                Some(command) => command,
                None => match self.rx.recv().await {
                    Some(command) => command,
                    None => break,
                },
            };

            // Only the newest of consecutive timer snapshots is worth writing
            let command = match command {
                StoreCommand::SaveTimers(mut timers) => {
                    while let Ok(next) = self.rx.try_recv() {
                        match next {
                            StoreCommand::SaveTimers(newer) => {
                                debug!("Coalescing queued timer snapshot");
                                timers = newer;
                            }
                            other => {
                                deferred = Some(other);
                                break;
                            }
                        }
                    }
                    StoreCommand::SaveTimers(timers)
                }
                other => other,
            };

            self.execute(command).await;
        }

        if let Some(straggler) = self.straggler.take() {
            let _ = straggler.await;
        }
        info!("Persistence writer stopped");
    }

    async fn execute(&mut self, command: StoreCommand) {
        let operation = command.operation();
        match command {
            StoreCommand::SaveTimers(timers) => {
                let result = self.blocking(move |store| store.save_timers(&timers)).await;
                self.report(operation, &result);
            }
            StoreCommand::AppendHistory(record) => {
                let result = self.blocking(move |store| store.append_history(&record)).await;
                self.report(operation, &result);
            }
            StoreCommand::LoadHistory(reply) => {
                let result = self.blocking(|store| store.load_history()).await;
                self.report(operation, &result);
                let _ = reply.send(result);
            }
            StoreCommand::ClearHistory(reply) => {
                let result = self.blocking(|store| store.clear_history()).await;
                self.report(operation, &result);
                let _ = reply.send(result);
            }
        }
    }

    async fn blocking<T, F>(&mut self, op: F) -> Result<T, StoreError>
    where
        F: FnOnce(&dyn TimerStore) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        if let Some(straggler) = self.straggler.take() {
            debug!("Waiting for timed-out store call to finish");
            if let Err(e) = straggler.await {
                warn!("Timed-out store call did not finish cleanly: {}", e);
            }
        }

        let store = Arc::clone(&self.store);
        let mut handle = task::spawn_blocking(move || op(&*store));

        let outcome = timeout(self.timeout, &mut handle).await;
        match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(StoreError::Io(io::Error::new(io::ErrorKind::Other, e.to_string()))),
            Err(_) => {
                self.straggler = Some(tokio::spawn(async move {
                    let _ = handle.await;
                }));
                Err(StoreError::Timeout(self.timeout))
            }
        }
    }

    fn report<T>(&self, operation: &str, result: &Result<T, StoreError>) {
        let Err(e) = result else {
            debug!("{} ok", operation);
            return;
        };
        error!("Store {} failed: {}", operation, e);
        let event = EngineEvent::PersistenceFailed {
            operation: operation.to_string(),
            message: e.to_string(),
        };
        if self.event_tx.send(event).is_err() {
            debug!("No event subscribers");
        }
    }
}

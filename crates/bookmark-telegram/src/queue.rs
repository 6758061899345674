//! Background storage workers.
//!
//! Handlers push processed messages onto a bounded channel; a fixed pool of
//! workers pulls from it and saves each message to every configured
//! storage. Workers exit once all senders are dropped and the channel is
//! drained.

use std::sync::Arc;

use bookmark_core::StorageBackend;
use bookmark_storage::{ProcessedMessage, Storage};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::error::{Result, TelegramError};
use crate::state::BotState;

/// Pending messages per worker before handlers wait.
const QUEUE_DEPTH_PER_WORKER: usize = 32;

/// Sending side of the storage queue.
#[derive(Clone)]
pub struct StorageQueue {
    /// The sending half shared by every handler.
    tx: mpsc::Sender<ProcessedMessage>,
}

impl StorageQueue {
    /// Spawn `workers` storage workers and return the queue feeding them.
    pub fn start(
        storages: Vec<Arc<dyn Storage>>,
        state: Arc<BotState>,
        workers: usize,
    ) -> (Self, Vec<JoinHandle<()>>) {
        let workers = workers.max(1);
        let (tx, rx) = mpsc::channel(workers * QUEUE_DEPTH_PER_WORKER);
        let rx = Arc::new(Mutex::new(rx));
        let storages = Arc::new(storages);

        let handles = (0..workers)
            .map(|worker| {
                let rx = Arc::clone(&rx);
                let storages = Arc::clone(&storages);
                let state = Arc::clone(&state);
                tokio::spawn(async move { run_worker(worker, rx, storages, state).await })
            })
            .collect();

        info!(workers, "Storage workers started");
        (Self { tx }, handles)
    }

    /// Queue a message for storage.
    pub async fn enqueue(&self, record: ProcessedMessage) -> Result<()> {
        let message_id = record.message_id;
        self.tx.send(record).await.map_err(|_| TelegramError::QueueClosed)?;
        debug!(message_id, "Queued message for storage");
        Ok(())
    }
}

async fn run_worker(
    worker: usize,
    rx: Arc<Mutex<mpsc::Receiver<ProcessedMessage>>>,
    storages: Arc<Vec<Arc<dyn Storage>>>,
    state: Arc<BotState>,
) {
    loop {
        let next = rx.lock().await.recv().await;
        let Some(record) = next else {
            debug!(worker, "Storage queue closed, worker exiting");
            break;
        };

        for (backend, id) in save_all(&storages, &record).await {
            state.record_saved(record.user_id, record.message_id, backend, id).await;
        }
    }
}

/// Save a message to every storage, returning the ids that were written.
///
/// Failures are logged and do not stop the remaining backends.
pub async fn save_all(storages: &[Arc<dyn Storage>], record: &ProcessedMessage) -> Vec<(StorageBackend, String)> {
    let mut saved = Vec::new();
    for storage in storages {
        match storage.save(record).await {
            Ok(id) => {
                info!(backend = %storage.backend(), message_id = record.message_id, id = %id, "Saved message");
                saved.push((storage.backend(), id));
            }
            Err(e) => {
                error!(backend = %storage.backend(), message_id = record.message_id, error = %e, "Failed to save message");
            }
        }
    }
    saved
}

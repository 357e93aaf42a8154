//! Batched entity saves.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, error};

use chathub_core::config::batcher::BatcherConfig;
use chathub_core::schema::Entity;
use chathub_database::Repository;

use crate::pool::WorkerPool;

/// Buffers entities and saves them in batches through the repository.
#[derive(Debug)]
pub struct SaveBatcher<E: Entity> {
    shared: Arc<Shared<E>>,
    cancel: watch::Sender<bool>,
    timer: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

#[derive(Debug)]
struct Shared<E: Entity> {
    buffer: Mutex<Vec<E>>,
    batch_size: usize,
    repo: Repository<E>,
    pool: Arc<WorkerPool>,
}

impl<E: Entity> SaveBatcher<E> {
    /// Create a batcher and start its timer task.
    pub fn new(repo: Repository<E>, pool: Arc<WorkerPool>, config: &BatcherConfig) -> Self {
        let shared = Arc::new(Shared {
            buffer: Mutex::new(Vec::new()),
            batch_size: config.batch_size.max(1),
            repo,
            pool,
        });

        let (cancel, cancel_rx) = watch::channel(false);
        let interval = Duration::from_secs(config.flush_interval_seconds);
        let timer = tokio::spawn(timer_loop(Arc::clone(&shared), interval, cancel_rx));

        Self {
            shared,
            cancel,
            timer: tokio::sync::Mutex::new(Some(timer)),
        }
    }

    /// Buffer one entity; a full buffer is swapped out and flushed on the
    /// worker pool.
    pub fn add(&self, entity: E) {
        let full_batch = {
            let mut buffer = self
                .shared
                .buffer
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            buffer.push(entity);
            if buffer.len() >= self.shared.batch_size {
                Some(std::mem::take(&mut *buffer))
            } else {
                None
            }
        };

        if let Some(batch) = full_batch {
            submit_flush(&self.shared, batch);
        }
    }

    /// Number of entities currently buffered.
    pub fn pending(&self) -> usize {
        self.shared
            .buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Stop the timer, join it, and flush the remainder synchronously.
    ///
    /// Nothing buffered at shutdown is dropped. Flushes already submitted
    /// to the worker pool are awaited by the pool's own shutdown/wait_all.
    pub async fn shutdown(&self) {
        let _ = self.cancel.send(true);
        if let Some(handle) = self.timer.lock().await.take() {
            let _ = handle.await;
        }

        let remainder = {
            let mut buffer = self
                .shared
                .buffer
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *buffer)
        };
        flush(self.shared.repo.clone(), remainder).await;
    }
}

async fn timer_loop<E: Entity>(
    shared: Arc<Shared<E>>,
    interval: Duration,
    mut cancel: watch::Receiver<bool>,
) {
    // interval_at skips tokio's immediate first tick.
    let mut ticker = time::interval_at(time::Instant::now() + interval, interval);
    loop {
        tokio::select! {
            changed = cancel.changed() => {
                if changed.is_err() || *cancel.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                let batch = {
                    let mut buffer = shared.buffer.lock().unwrap_or_else(PoisonError::into_inner);
                    std::mem::take(&mut *buffer)
                };
                if !batch.is_empty() {
                    submit_flush(&shared, batch);
                }
            }
        }
    }
}

fn submit_flush<E: Entity>(shared: &Arc<Shared<E>>, batch: Vec<E>) {
    let repo = shared.repo.clone();
    let _ = shared.pool.submit(flush(repo, batch));
}

async fn flush<E: Entity>(repo: Repository<E>, mut batch: Vec<E>) {
    if batch.is_empty() {
        return;
    }
    let count = batch.len();
    let table = E::schema().table_name();
    match repo.save_batch(&mut batch).await {
        Ok(()) => debug!(table, count, "save batch flushed"),
        Err(e) => error!(table, count, error = %e, "dropping failed save batch"),
    }
}

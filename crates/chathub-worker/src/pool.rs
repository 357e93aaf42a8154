//! Fixed-size worker pool draining a shared task queue.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures::future::BoxFuture;
use tokio::sync::{Notify, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use chathub_core::config::worker::WorkerPoolConfig;
use chathub_core::traits::spawn::{TaskHandle, TaskSpawner, submit_to};

type Task = BoxFuture<'static, ()>;

/// A fixed set of worker tasks draining one shared queue.
///
/// [`submit`](Self::submit) hands back a future per task. Shutdown is
/// cooperative: the intake closes, already-queued tasks run to completion,
/// and the workers exit once the queue is drained — running tasks are
/// never cancelled.
#[derive(Debug)]
pub struct WorkerPool {
    sender: Mutex<Option<mpsc::UnboundedSender<Task>>>,
    workers: tokio::sync::Mutex<Vec<JoinHandle<()>>>,
    pending: Arc<AtomicUsize>,
    drained: Arc<Notify>,
}

impl WorkerPool {
    /// Spawn a pool with the given number of workers (at least one).
    pub fn new(workers: usize) -> Self {
        let workers = workers.max(1);
        let (sender, receiver) = mpsc::unbounded_channel::<Task>();
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));

        let handles = (0..workers)
            .map(|index| {
                let receiver = Arc::clone(&receiver);
                tokio::spawn(async move {
                    debug!(worker = index, "worker started");
                    loop {
                        let task = { receiver.lock().await.recv().await };
                        match task {
                            Some(task) => task.await,
                            None => break,
                        }
                    }
                    debug!(worker = index, "worker stopped");
                })
            })
            .collect();

        Self {
            sender: Mutex::new(Some(sender)),
            workers: tokio::sync::Mutex::new(handles),
            pending: Arc::new(AtomicUsize::new(0)),
            drained: Arc::new(Notify::new()),
        }
    }

    /// Spawn a pool from configuration.
    pub fn from_config(config: &WorkerPoolConfig) -> Self {
        Self::new(config.workers)
    }

    /// Submit a task; the handle resolves to its result.
    ///
    /// After [`shutdown`](Self::shutdown) the task is dropped and the
    /// handle's `join` fails with `ServiceUnavailable`.
    pub fn submit<T, F>(&self, future: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: Future<Output = T> + Send + 'static,
    {
        submit_to(self, future)
    }

    /// Number of tasks queued or running.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Block until the queue is empty and no task is in flight.
    pub async fn wait_all(&self) {
        loop {
            let notified = self.drained.notified();
            if self.pending.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Stop accepting tasks, drain the queue, and join the workers.
    pub async fn shutdown(&self) {
        {
            let mut sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
            sender.take();
        }
        let handles = std::mem::take(&mut *self.workers.lock().await);
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "worker task join failed");
            }
        }
    }
}

impl TaskSpawner for WorkerPool {
    fn spawn_boxed(&self, task: BoxFuture<'static, ()>) {
        let pending = Arc::clone(&self.pending);
        let drained = Arc::clone(&self.drained);
        pending.fetch_add(1, Ordering::SeqCst);

        let wrapped: Task = Box::pin(async move {
            task.await;
            if pending.fetch_sub(1, Ordering::SeqCst) == 1 {
                drained.notify_waiters();
            }
        });

        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        let rejected = match sender.as_ref() {
            Some(tx) => tx.send(wrapped).is_err(),
            None => true,
        };
        if rejected {
            // Dropped without running; undo the bookkeeping.
            if self.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
                self.drained.notify_waiters();
            }
            warn!("worker pool is shut down; task rejected");
        }
    }
}

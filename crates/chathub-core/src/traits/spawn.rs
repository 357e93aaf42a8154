//! Task submission boundary.
//!
//! The query and repository layers offer asynchronous variants backed by a
//! worker pool without depending on the pool crate; they only see this
//! trait. The pool implements it and hands back a future per submitted
//! task through [`TaskHandle`].

use std::future::Future;

use futures::future::BoxFuture;
use tokio::sync::oneshot;

use crate::error::AppError;
use crate::result::AppResult;

/// Accepts opaque tasks for background execution.
pub trait TaskSpawner: Send + Sync + std::fmt::Debug + 'static {
    /// Enqueue a task. A spawner that is shut down drops the task, which
    /// surfaces to the submitter as a failed [`TaskHandle::join`].
    fn spawn_boxed(&self, task: BoxFuture<'static, ()>);
}

/// The future side of a submitted task.
#[derive(Debug)]
pub struct TaskHandle<T> {
    rx: oneshot::Receiver<T>,
}

impl<T> TaskHandle<T> {
    /// Wait for the task to finish and return its result.
    ///
    /// Fails with `ServiceUnavailable` if the task was dropped before
    /// completion (spawner shut down or panicked).
    pub async fn join(self) -> AppResult<T> {
        self.rx
            .await
            .map_err(|_| AppError::service_unavailable("task was dropped before completion"))
    }
}

/// Submit a typed future to a spawner and get a handle to its result.
pub fn submit_to<T, F>(spawner: &dyn TaskSpawner, future: F) -> TaskHandle<T>
where
    T: Send + 'static,
    F: Future<Output = T> + Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    spawner.spawn_boxed(Box::pin(async move {
        let _ = tx.send(future.await);
    }));
    TaskHandle { rx }
}

//! Bounded worker pool for blocking handler work.
//!
//! Jobs run on tokio's blocking threads while holding one of `size` semaphore
//! permits. Waiting callers queue on the semaphore in FIFO order. A job keeps its
//! permit until it returns, even if the caller stopped waiting, so
//! [`WorkerPool::shutdown`] also drains abandoned work.
use crate::error::panic_reason;
use crate::{Result, TextxtractError};
use std::sync::Arc;
use tokio::sync::Semaphore;

#[derive(Debug)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    size: usize,
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        let size = size.clamp(1, Semaphore::MAX_PERMITS);
        tracing::debug!(workers = size, "Created worker pool");
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_closed(&self) -> bool {
        self.permits.is_closed()
    }

    /// Jobs currently holding a worker slot.
    pub fn in_flight(&self) -> usize {
        if self.is_closed() {
            return 0;
        }
        self.size.saturating_sub(self.permits.available_permits())
    }

    /// Run `job` on a worker and wait for its result.
    ///
    /// # Errors
    ///
    /// - `Usage` if the pool has been shut down
    /// - `Extraction` if the job panicked or was cancelled by the runtime
    /// - whatever `job` returns
    pub async fn run<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| TextxtractError::usage("Extractor has been shut down; create a new one"))?;

        let handle = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            job()
        });

        match handle.await {
            Ok(result) => result,
            Err(join_err) if join_err.is_panic() => {
                let payload = join_err.into_panic();
                Err(TextxtractError::extraction(format!(
                    "Handler panicked: {}",
                    panic_reason(payload.as_ref())
                )))
            }
            Err(join_err) => Err(TextxtractError::extraction_with_source("Worker task was cancelled", join_err)),
        }
    }

    /// Wait for every in-flight job to finish, then refuse new work.
    pub async fn shutdown(&self) {
        if self.is_closed() {
            return;
        }

        let wanted = u32::try_from(self.size).unwrap_or(u32::MAX);
        if let Ok(drained) = self.permits.acquire_many(wanted).await {
            tracing::debug!(workers = self.size, "Worker pool drained");
            self.permits.close();
            drop(drained);
        }
    }

    /// Refuse new work without waiting for in-flight jobs.
    pub fn close(&self) {
        self.permits.close();
    }
}

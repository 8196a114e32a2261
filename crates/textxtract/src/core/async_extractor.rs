//! Non-blocking extraction pipeline.
//!
//! [`AsyncExtractor`] keeps the caller's task free: validation (which may write a
//! temporary file) and handler work both run on a bounded [`WorkerPool`]. The
//! caller only merges configuration, waits (optionally under a timeout) and
//! performs the final temporary-file cleanup.
use crate::core::config::{ConfigOverrides, ExtractionConfig, LogLevel, global_defaults};
use crate::core::context::ExtractionContext;
use crate::core::extractor::{dispatch, effective_config, release};
use crate::core::lifecycle::{ExtractionState, Lifecycle};
use crate::core::pool::WorkerPool;
use crate::core::validation::{ResolvedFile, validate_request};
use crate::plugins::registry::{HandlerRegistry, get_handler_registry};
use crate::types::{ExtractionRequest, Source};
use crate::{Result, TextxtractError};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Asynchronous text extractor backed by a bounded worker pool.
///
/// The pool is created on first use and sized by `max_workers` (default: CPU
/// count). Call [`AsyncExtractor::close`] (or use [`AsyncExtractor::scoped`])
/// to drain in-flight work; dropping the extractor only stops new work.
///
/// A call that times out returns `Timeout` at once, but its blocking job cannot
/// be cancelled: it keeps its worker slot until the handler returns, so with
/// `max_workers = 1` the next call waits behind it.
///
/// Temporary files are removed when each call returns and again when its job
/// finishes. Dropping the extractor does not wait for abandoned jobs, so if the
/// process exits while one is still running, the temporary file it holds is left
/// behind. Await [`AsyncExtractor::close`] before exit to avoid that.
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
/// use textxtract::{AsyncExtractor, ConfigOverrides};
///
/// # async fn example() -> textxtract::Result<()> {
/// let extractor = AsyncExtractor::with_config(
///     ConfigOverrides::default().with_timeout(Duration::from_secs(30)),
/// )?;
/// let text = extractor.extract("report.docx", None, None).await?;
/// extractor.close().await;
/// # Ok(())
/// # }
/// ```
pub struct AsyncExtractor {
    overrides: ConfigOverrides,
    registry: Arc<HandlerRegistry>,
    workers: usize,
    pool: OnceCell<WorkerPool>,
    closed: AtomicBool,
}

impl AsyncExtractor {
    /// Extractor using process defaults and the global registry.
    pub fn new() -> Self {
        Self {
            overrides: ConfigOverrides::default(),
            registry: get_handler_registry(),
            workers: global_defaults().worker_count(),
            pool: OnceCell::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Extractor with extractor-level overrides. The overrides are validated now
    /// and `max_workers` fixes the pool size.
    pub fn with_config(overrides: ConfigOverrides) -> Result<Self> {
        let config = global_defaults().merged(&overrides)?;
        Ok(Self {
            overrides,
            registry: get_handler_registry(),
            workers: config.worker_count(),
            pool: OnceCell::new(),
            closed: AtomicBool::new(false),
        })
    }

    /// Use a private registry instead of the global one.
    pub fn with_registry(mut self, registry: Arc<HandlerRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    /// Effective extractor-level configuration (process defaults plus this extractor's overrides).
    pub fn config(&self) -> Result<ExtractionConfig> {
        global_defaults().merged(&self.overrides)
    }

    pub fn worker_count(&self) -> usize {
        self.workers
    }

    /// Whether the worker pool has been created yet.
    pub fn is_started(&self) -> bool {
        self.pool.get().is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn pool(&self) -> &WorkerPool {
        self.pool.get_or_init(|| WorkerPool::new(self.workers))
    }

    /// Extract text from a path or byte buffer without blocking the caller.
    ///
    /// # Errors
    ///
    /// Same as [`crate::SyncExtractor::extract`], plus `Timeout` when the effective
    /// `timeout` elapses and `Usage` after [`AsyncExtractor::close`].
    pub async fn extract(
        &self,
        source: impl Into<Source>,
        filename: Option<&str>,
        overrides: Option<&ConfigOverrides>,
    ) -> Result<String> {
        let request = ExtractionRequest {
            source: source.into(),
            filename: filename.map(str::to_string),
            overrides: overrides.cloned().unwrap_or_default(),
        };
        self.extract_request(request).await
    }

    #[tracing::instrument(
        name = "extract_async",
        skip_all,
        fields(extension = tracing::field::Empty, size = tracing::field::Empty, temporary = tracing::field::Empty)
    )]
    pub async fn extract_request(&self, request: ExtractionRequest) -> Result<String> {
        let lifecycle = Arc::new(Mutex::new(Lifecycle::new()));
        lifecycle.lock().advance(ExtractionState::Validating);

        let config = match self.prepare(&request) {
            Ok(config) => config,
            Err(e) => {
                let result = Err(e);
                lifecycle.lock().finish(&result, LogLevel::Debug);
                return result;
            }
        };

        let level = config.log_level();
        let limit = config.timeout_duration();
        let slot: Arc<Mutex<Option<Arc<ResolvedFile>>>> = Arc::new(Mutex::new(None));

        let job = {
            let registry = Arc::clone(&self.registry);
            let lifecycle = Arc::clone(&lifecycle);
            let slot = Arc::clone(&slot);
            let span = tracing::Span::current();

            move || -> Result<String> {
                let _entered = span.enter();
                let file = Arc::new(validate_request(&request, &config, &registry)?);
                *slot.lock() = Some(Arc::clone(&file));

                span.record("extension", file.extension());
                span.record("size", file.size());
                span.record("temporary", file.is_temporary());

                let ctx = ExtractionContext::new(config, registry);
                lifecycle.lock().advance(ExtractionState::Resolving);
                let outcome = ctx.registry().resolve(file.extension()).and_then(|handler| {
                    lifecycle.lock().advance(ExtractionState::Extracting);
                    dispatch(handler.as_ref(), &file, &ctx)
                });

                lifecycle.lock().advance(ExtractionState::Cleaning);
                release(&file);
                outcome
            }
        };

        let work = self.pool().run(job);
        let result = match limit {
            Some(timeout) => match tokio::time::timeout(timeout, work).await {
                Ok(result) => result,
                Err(_) => Err(TextxtractError::Timeout { timeout }),
            },
            None => work.await,
        };

        let abandoned = slot.lock().take();
        if let Some(file) = abandoned {
            release(&file);
        }

        lifecycle.lock().finish(&result, level);
        result
    }

    fn prepare(&self, request: &ExtractionRequest) -> Result<Arc<ExtractionConfig>> {
        if self.is_closed() {
            return Err(TextxtractError::usage("Extractor has been shut down; create a new one"));
        }
        request.check_shape()?;
        effective_config(&self.overrides, &request.overrides)
    }

    /// Drain in-flight work and shut the pool down. Later calls fail with `Usage`.
    pub async fn close(&self) {
        self.closed.store(true, Ordering::Release);
        if let Some(pool) = self.pool.get() {
            pool.shutdown().await;
        }
    }

    /// Run `f` with this extractor, then drain and shut it down.
    ///
    /// ```rust,no_run
    /// # async fn example() -> textxtract::Result<()> {
    /// use textxtract::AsyncExtractor;
    ///
    /// let text = AsyncExtractor::new()
    ///     .scoped(async |extractor| extractor.extract("notes.md", None, None).await)
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn scoped<F, R>(self, f: F) -> R
    where
        F: AsyncFnOnce(&AsyncExtractor) -> R,
    {
        let result = f(&self).await;
        self.close().await;
        result
    }
}

impl Default for AsyncExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AsyncExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncExtractor")
            .field("workers", &self.workers)
            .field("started", &self.is_started())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Drop for AsyncExtractor {
    fn drop(&mut self) {
        if let Some(pool) = self.pool.get()
            && !pool.is_closed()
        {
            tracing::debug!(in_flight = pool.in_flight(), "AsyncExtractor dropped without close; stopping pool");
            pool.close();
        }
    }
}

/// Extract text from a file on disk with a one-off async extractor.
pub async fn extract_file(path: impl AsRef<Path>, overrides: Option<&ConfigOverrides>) -> Result<String> {
    let extractor = AsyncExtractor::new();
    let result = extractor.extract(path.as_ref(), None, overrides).await;
    extractor.close().await;
    result
}

/// Extract text from an in-memory buffer with a one-off async extractor.
pub async fn extract_bytes(bytes: Vec<u8>, filename: &str, overrides: Option<&ConfigOverrides>) -> Result<String> {
    let extractor = AsyncExtractor::new();
    let result = extractor.extract(bytes, Some(filename), overrides).await;
    extractor.close().await;
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use tempfile::tempdir;

    fn private_extractor(overrides: ConfigOverrides) -> AsyncExtractor {
        AsyncExtractor::with_config(overrides)
            .unwrap()
            .with_registry(Arc::new(HandlerRegistry::with_defaults()))
    }

    #[tokio::test]
    async fn test_extract_bytes_async() {
        let extractor = private_extractor(ConfigOverrides::default());
        assert!(!extractor.is_started());

        let text = extractor
            .extract(b"async hello".to_vec(), Some("a.txt"), None)
            .await
            .unwrap();
        assert_eq!(text, "async hello");
        assert!(extractor.is_started());
        extractor.close().await;
    }

    #[tokio::test]
    async fn test_pool_sized_by_config() {
        let extractor = private_extractor(ConfigOverrides::default().with_max_workers(3));
        assert_eq!(extractor.worker_count(), 3);
    }

    #[tokio::test]
    async fn test_usage_error_before_pool_start() {
        let extractor = private_extractor(ConfigOverrides::default());
        let err = extractor.extract(b"x".to_vec(), None, None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Usage);
        assert!(!extractor.is_started());
    }

    #[tokio::test]
    async fn test_extract_after_close_is_usage_error() {
        let extractor = private_extractor(ConfigOverrides::default());
        extractor.extract(b"x".to_vec(), Some("a.txt"), None).await.unwrap();
        extractor.close().await;

        let err = extractor.extract(b"x".to_vec(), Some("a.txt"), None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Usage);
        assert!(extractor.is_closed());
    }

    #[tokio::test]
    async fn test_temp_files_removed_async() {
        let dir = tempdir().unwrap();
        let extractor = private_extractor(ConfigOverrides::default().with_temp_dir(dir.path()));

        extractor.extract(b"one".to_vec(), Some("a.txt"), None).await.unwrap();
        let _ = extractor.extract(b"two".to_vec(), Some("a.xyz"), None).await;

        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
        extractor.close().await;
    }

    #[tokio::test]
    async fn test_scoped_closes_extractor() {
        let extractor = private_extractor(ConfigOverrides::default());
        let text = extractor
            .scoped(async |ex| ex.extract(b"scoped".to_vec(), Some("s.txt"), None).await)
            .await
            .unwrap();
        assert_eq!(text, "scoped");
    }

    #[tokio::test]
    async fn test_drop_without_close_does_not_panic() {
        let extractor = private_extractor(ConfigOverrides::default());
        extractor.extract(b"x".to_vec(), Some("a.txt"), None).await.unwrap();
        drop(extractor);
    }
}

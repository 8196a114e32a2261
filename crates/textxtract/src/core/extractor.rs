//! Blocking extraction pipeline.
//!
//! [`SyncExtractor`] runs validate → resolve → extract → cleanup on the
//! caller's thread. The helpers here are shared with the async orchestrator
//! and with archive traversal, so every dispatch applies the same panic
//! capture and error categorization.
use crate::core::config::{ConfigOverrides, ExtractionConfig, LogLevel, global_defaults};
use crate::core::context::ExtractionContext;
use crate::core::lifecycle::{ExtractionState, Lifecycle};
use crate::core::validation::{ResolvedFile, validate_request};
use crate::error::panic_reason;
use crate::plugins::Handler;
use crate::plugins::registry::{HandlerRegistry, get_handler_registry};
use crate::types::{ExtractionRequest, Source};
use crate::{Result, TextxtractError};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;
use std::sync::Arc;

/// Merge process defaults, extractor-level and per-call overrides, in that order.
pub(crate) fn effective_config(extractor: &ConfigOverrides, call: &ConfigOverrides) -> Result<Arc<ExtractionConfig>> {
    let config = global_defaults().merged(extractor)?.merged(call)?;
    Ok(Arc::new(config))
}

/// Run `handler` on `file`, turning panics and stray error kinds into `Extraction`.
pub(crate) fn dispatch(handler: &dyn Handler, file: &ResolvedFile, ctx: &ExtractionContext) -> Result<String> {
    let outcome = catch_unwind(AssertUnwindSafe(|| handler.extract(file, ctx))).unwrap_or_else(|panic| {
        Err(TextxtractError::extraction(format!(
            "Handler '{}' panicked: {}",
            handler.name(),
            panic_reason(panic.as_ref())
        )))
    });

    outcome.map_err(|e| categorize(e, handler).with_extension(file.extension()))
}

fn categorize(err: TextxtractError, handler: &dyn Handler) -> TextxtractError {
    match err {
        TextxtractError::InvalidFile { .. } | TextxtractError::Extraction { .. } => err,
        other => TextxtractError::extraction_with_source(
            format!("Handler '{}' failed", handler.name()),
            other,
        ),
    }
}

/// Resolve the handler for an already validated file and run it.
pub(crate) fn resolve_and_extract(
    file: &ResolvedFile,
    ctx: &ExtractionContext,
    lifecycle: &mut Lifecycle,
) -> Result<String> {
    lifecycle.advance(ExtractionState::Resolving);
    let handler = ctx.registry().resolve(file.extension())?;

    lifecycle.advance(ExtractionState::Extracting);
    dispatch(handler.as_ref(), file, ctx)
}

/// Release a temporary file, logging instead of failing.
pub(crate) fn release(file: &ResolvedFile) {
    if let Err(e) = file.release() {
        tracing::warn!(path = %file.path().display(), error = %e, "Failed to remove temporary file");
    }
}

/// Synchronous text extractor.
///
/// Holds only configuration and a registry handle, so it is cheap to clone and
/// has nothing to release between calls.
///
/// # Example
///
/// ```rust,no_run
/// use textxtract::SyncExtractor;
///
/// let extractor = SyncExtractor::new();
/// let text = extractor.extract("report.pdf", None, None)?;
/// let text = extractor.extract(b"hello".to_vec(), Some("note.txt"), None)?;
/// # Ok::<(), textxtract::TextxtractError>(())
/// ```
#[derive(Debug, Clone)]
pub struct SyncExtractor {
    overrides: ConfigOverrides,
    registry: Arc<HandlerRegistry>,
}

impl SyncExtractor {
    /// Extractor using process defaults and the global registry.
    pub fn new() -> Self {
        Self {
            overrides: ConfigOverrides::default(),
            registry: get_handler_registry(),
        }
    }

    /// Extractor with extractor-level overrides. The overrides are validated now.
    pub fn with_config(overrides: ConfigOverrides) -> Result<Self> {
        global_defaults().merged(&overrides)?;
        Ok(Self {
            overrides,
            registry: get_handler_registry(),
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

    /// Extract text from a path or byte buffer.
    ///
    /// `filename` is required for byte buffers and optional for paths, where it
    /// overrides the extension taken from the path.
    pub fn extract(
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
        self.extract_request(&request)
    }

    #[tracing::instrument(
        name = "extract_sync",
        skip_all,
        fields(extension = tracing::field::Empty, size = tracing::field::Empty, temporary = tracing::field::Empty)
    )]
    pub fn extract_request(&self, request: &ExtractionRequest) -> Result<String> {
        let mut lifecycle = Lifecycle::new();
        lifecycle.advance(ExtractionState::Validating);

        let config = match request
            .check_shape()
            .and_then(|_| effective_config(&self.overrides, &request.overrides))
        {
            Ok(config) => config,
            Err(e) => {
                let result = Err(e);
                lifecycle.finish(&result, LogLevel::Debug);
                return result;
            }
        };

        let level = config.log_level();
        let result = self.run(request, config, &mut lifecycle);
        lifecycle.finish(&result, level);
        result
    }

    fn run(&self, request: &ExtractionRequest, config: Arc<ExtractionConfig>, lifecycle: &mut Lifecycle) -> Result<String> {
        let file = validate_request(request, &config, &self.registry)?;

        let span = tracing::Span::current();
        span.record("extension", file.extension());
        span.record("size", file.size());
        span.record("temporary", file.is_temporary());

        let ctx = ExtractionContext::new(config, Arc::clone(&self.registry));
        let outcome = resolve_and_extract(&file, &ctx, lifecycle);

        lifecycle.advance(ExtractionState::Cleaning);
        release(&file);
        outcome
    }

    /// Run `f` with this extractor, then close it.
    pub fn scoped<R>(self, f: impl FnOnce(&Self) -> R) -> R {
        let result = f(&self);
        self.close();
        result
    }

    /// Provided for symmetry with [`crate::AsyncExtractor::close`]; there is nothing to release.
    pub fn close(self) {}
}

impl Default for SyncExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract text from a file on disk with the global registry.
pub fn extract_file_sync(path: impl AsRef<Path>, overrides: Option<&ConfigOverrides>) -> Result<String> {
    SyncExtractor::new().extract(path.as_ref(), None, overrides)
}

/// Extract text from an in-memory buffer; `filename` supplies the extension.
pub fn extract_bytes_sync(bytes: &[u8], filename: &str, overrides: Option<&ConfigOverrides>) -> Result<String> {
    SyncExtractor::new().extract(bytes, Some(filename), overrides)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use crate::plugins::Plugin;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    struct PanickyHandler;

    impl Plugin for PanickyHandler {
        fn name(&self) -> &str {
            "panicky-handler"
        }

        fn version(&self) -> String {
            "0.0.1".to_string()
        }

        fn initialize(&self) -> Result<()> {
            Ok(())
        }

        fn shutdown(&self) -> Result<()> {
            Ok(())
        }
    }

    impl Handler for PanickyHandler {
        fn extract(&self, _file: &ResolvedFile, _ctx: &ExtractionContext) -> Result<String> {
            panic!("boom")
        }

        fn supported_extensions(&self) -> &[&str] {
            &["boom"]
        }
    }

    struct MisbehavingHandler;

    impl Plugin for MisbehavingHandler {
        fn name(&self) -> &str {
            "misbehaving-handler"
        }

        fn version(&self) -> String {
            "0.0.1".to_string()
        }

        fn initialize(&self) -> Result<()> {
            Ok(())
        }

        fn shutdown(&self) -> Result<()> {
            Ok(())
        }
    }

    impl Handler for MisbehavingHandler {
        fn extract(&self, _file: &ResolvedFile, _ctx: &ExtractionContext) -> Result<String> {
            Err(TextxtractError::usage("not my fault"))
        }

        fn supported_extensions(&self) -> &[&str] {
            &["odd"]
        }
    }

    fn private_extractor() -> SyncExtractor {
        SyncExtractor::new().with_registry(Arc::new(HandlerRegistry::with_defaults()))
    }

    #[test]
    fn test_extract_text_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test.txt");
        let mut file = File::create(&file_path).unwrap();
        file.write_all(b"Hello, world!").unwrap();

        let text = private_extractor().extract(&file_path, None, None).unwrap();
        assert_eq!(text, "Hello, world!");
    }

    #[test]
    fn test_extract_bytes() {
        let text = private_extractor()
            .extract(b"Hello bytes".to_vec(), Some("greeting.txt"), None)
            .unwrap();
        assert_eq!(text, "Hello bytes");
    }

    #[test]
    fn test_bytes_without_filename() {
        let err = private_extractor().extract(b"abc".to_vec(), None, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn test_per_call_overrides_apply() {
        let overrides = ConfigOverrides::default().with_max_file_size(2);
        let err = private_extractor()
            .extract(b"abc".to_vec(), Some("a.txt"), Some(&overrides))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFile);
    }

    #[test]
    fn test_extractor_level_overrides_apply() {
        let extractor = SyncExtractor::with_config(ConfigOverrides::default().with_max_file_size(2))
            .unwrap()
            .with_registry(Arc::new(HandlerRegistry::with_defaults()));
        assert_eq!(extractor.config().unwrap().max_file_size, 2);

        let err = extractor.extract(b"abc".to_vec(), Some("a.txt"), None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFile);

        let per_call = ConfigOverrides::default().with_max_file_size(10);
        assert!(extractor.extract(b"abc".to_vec(), Some("a.txt"), Some(&per_call)).is_ok());
    }

    #[test]
    fn test_invalid_extractor_config_is_rejected_early() {
        let err = SyncExtractor::with_config(ConfigOverrides::default().with_encoding("nope")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn test_handler_panic_becomes_extraction_error() {
        let registry = Arc::new(HandlerRegistry::new());
        registry
            .register("boom", || Ok(Arc::new(PanickyHandler) as Arc<dyn Handler>), false)
            .unwrap();

        let err = SyncExtractor::new()
            .with_registry(registry)
            .extract(b"x".to_vec(), Some("a.boom"), None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Extraction);
        assert!(err.to_string().contains("(.boom)"));
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn test_stray_handler_error_kind_is_categorized() {
        let registry = Arc::new(HandlerRegistry::new());
        registry
            .register("odd", || Ok(Arc::new(MisbehavingHandler) as Arc<dyn Handler>), false)
            .unwrap();

        let err = SyncExtractor::new()
            .with_registry(registry)
            .extract(b"x".to_vec(), Some("a.odd"), None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Extraction);
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_scoped_returns_closure_result() {
        let text = private_extractor().scoped(|ex| ex.extract(b"scoped".to_vec(), Some("s.txt"), None));
        assert_eq!(text.unwrap(), "scoped");
    }

    #[test]
    fn test_temp_file_removed_after_failure() {
        let dir = tempdir().unwrap();
        let registry = Arc::new(HandlerRegistry::new());
        registry
            .register("boom", || Ok(Arc::new(PanickyHandler) as Arc<dyn Handler>), false)
            .unwrap();
        let overrides = ConfigOverrides::default().with_temp_dir(dir.path());

        let result = SyncExtractor::new()
            .with_registry(registry)
            .extract(b"x".to_vec(), Some("a.boom"), Some(&overrides));
        assert!(result.is_err());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}

//! Handler registration and lookup.
//!
//! The registry maps normalized extensions to handler factories. A factory runs
//! lazily on first [`HandlerRegistry::resolve`] and its instance is memoized for
//! the lifetime of the registration.
//!
//! # Thread Safety
//!
//! The table sits behind a `parking_lot::RwLock`. Lookups take the read lock just
//! long enough to clone the registration; factories run outside the lock, and
//! a per-registration `OnceCell` guarantees at most one successful construction.

use crate::core::validation::normalize_extension;
use crate::plugins::Handler;
use crate::{Result, TextxtractError};
use once_cell::sync::{Lazy, OnceCell};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Builds a handler on first use.
pub type HandlerFactory = Arc<dyn Fn() -> Result<Arc<dyn Handler>> + Send + Sync>;

struct Registration {
    factory: HandlerFactory,
    instance: OnceCell<Arc<dyn Handler>>,
}

impl Registration {
    fn lazy(factory: HandlerFactory) -> Self {
        Self {
            factory,
            instance: OnceCell::new(),
        }
    }

    fn constructed(&self) -> Option<&Arc<dyn Handler>> {
        self.instance.get()
    }
}

/// Validate an extension key before registration.
///
/// # Rules
///
/// - Cannot be empty (after stripping leading dots)
/// - Cannot contain whitespace or path separators
fn validate_extension(extension: &str) -> Result<String> {
    let normalized = normalize_extension(extension);

    if normalized.is_empty() {
        return Err(TextxtractError::usage("Handler extension cannot be empty"));
    }

    if normalized.contains(char::is_whitespace) || normalized.contains(['/', '\\']) {
        return Err(TextxtractError::usage(format!(
            "Handler extension '{}' cannot contain whitespace or path separators",
            extension
        )));
    }

    Ok(normalized)
}

fn shutdown_handler(extension: &str, handler: &Arc<dyn Handler>) {
    if let Err(e) = handler.shutdown() {
        tracing::warn!(extension, handler = handler.name(), error = %e, "Handler shutdown failed");
    }
}

/// Registry for format handlers.
///
/// # Example
///
/// ```rust
/// use textxtract::plugins::registry::HandlerRegistry;
///
/// let registry = HandlerRegistry::with_defaults();
/// assert!(registry.is_supported("pdf"));
/// assert!(registry.is_supported(".PDF"));
/// assert!(!registry.is_supported("xyz"));
/// ```
pub struct HandlerRegistry {
    entries: RwLock<HashMap<String, Arc<Registration>>>,
}

impl HandlerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Create a registry holding the built-in extension map.
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        crate::extractors::register_default_handlers(&registry);
        registry
    }

    /// Register a lazily constructed handler.
    ///
    /// # Errors
    ///
    /// - `Usage` if the extension is invalid
    /// - `Usage` if the extension is already registered and `overwrite` is false
    pub fn register<F>(&self, extension: &str, factory: F, overwrite: bool) -> Result<()>
    where
        F: Fn() -> Result<Arc<dyn Handler>> + Send + Sync + 'static,
    {
        let extension = validate_extension(extension)?;
        self.install(extension, Registration::lazy(Arc::new(factory)), overwrite)
    }

    /// Register an already constructed handler. `initialize` runs immediately.
    pub fn register_instance(&self, extension: &str, handler: Arc<dyn Handler>, overwrite: bool) -> Result<()> {
        let extension = validate_extension(extension)?;

        if !overwrite && self.is_supported(&extension) {
            return Err(already_registered(&extension));
        }

        handler.initialize()?;

        let shared = Arc::clone(&handler);
        let registration = Registration {
            factory: Arc::new(move || Ok(Arc::clone(&shared))),
            instance: OnceCell::with_value(handler),
        };
        self.install(extension, registration, overwrite)
    }

    /// Insert or replace a factory without the overwrite check. Used for built-ins.
    pub(crate) fn insert_factory(&self, extension: &str, factory: HandlerFactory) {
        let extension = normalize_extension(extension);
        let replaced = self
            .entries
            .write()
            .insert(extension.clone(), Arc::new(Registration::lazy(factory)));

        if let Some(old) = replaced.as_ref().and_then(|r| r.constructed()) {
            shutdown_handler(&extension, old);
        }
    }

    fn install(&self, extension: String, registration: Registration, overwrite: bool) -> Result<()> {
        let replaced = {
            let mut entries = self.entries.write();
            if !overwrite && entries.contains_key(&extension) {
                return Err(already_registered(&extension));
            }
            entries.insert(extension.clone(), Arc::new(registration))
        };

        match replaced.as_ref().and_then(|r| r.constructed()) {
            Some(old) => {
                tracing::debug!(extension = %extension, previous = old.name(), "Replaced handler");
                shutdown_handler(&extension, old);
            }
            None => tracing::debug!(extension = %extension, "Registered handler"),
        }

        Ok(())
    }

    /// Get the handler for an extension, constructing it on first use.
    ///
    /// # Errors
    ///
    /// - `FileTypeNotSupported` if nothing is registered for the extension
    /// - whatever the factory or `initialize` returns; the construction is retried on the next call
    pub fn resolve(&self, extension: &str) -> Result<Arc<dyn Handler>> {
        let extension = normalize_extension(extension);
        let registration = self
            .entries
            .read()
            .get(&extension)
            .cloned()
            .ok_or_else(|| TextxtractError::unsupported(extension.clone()))?;

        registration
            .instance
            .get_or_try_init(|| -> Result<Arc<dyn Handler>> {
                let handler = (registration.factory)()?;
                handler.initialize()?;
                tracing::debug!(
                    extension = %extension,
                    handler = handler.name(),
                    version = %handler.version(),
                    "Constructed handler"
                );
                Ok(handler)
            })
            .cloned()
            .map_err(|e| e.with_extension(&extension))
    }

    /// Remove a registration. Returns whether one existed.
    pub fn unregister(&self, extension: &str) -> bool {
        let extension = normalize_extension(extension);
        let removed = self.entries.write().remove(&extension);

        match removed {
            Some(registration) => {
                if let Some(handler) = registration.constructed() {
                    shutdown_handler(&extension, handler);
                }
                true
            }
            None => false,
        }
    }

    pub fn is_supported(&self, extension: &str) -> bool {
        self.entries.read().contains_key(&normalize_extension(extension))
    }

    /// Whether the handler for `extension` has been constructed yet.
    pub fn is_constructed(&self, extension: &str) -> bool {
        self.entries
            .read()
            .get(&normalize_extension(extension))
            .is_some_and(|r| r.constructed().is_some())
    }

    /// Registered extensions, sorted.
    pub fn extensions(&self) -> Vec<String> {
        let mut extensions: Vec<String> = self.entries.read().keys().cloned().collect();
        extensions.sort();
        extensions
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Shut down every constructed handler and drop all registrations.
    pub fn shutdown_all(&self) {
        let drained: Vec<(String, Arc<Registration>)> = self.entries.write().drain().collect();
        for (extension, registration) in drained {
            if let Some(handler) = registration.constructed() {
                shutdown_handler(&extension, handler);
            }
        }
    }

    /// Restore the built-in extension map, discarding custom registrations.
    pub fn reset_to_defaults(&self) {
        let fresh = Self::with_defaults();
        let fresh_entries = std::mem::take(&mut *fresh.entries.write());
        let previous = std::mem::replace(&mut *self.entries.write(), fresh_entries);

        for (extension, registration) in previous {
            if let Some(handler) = registration.constructed() {
                shutdown_handler(&extension, handler);
            }
        }
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("extensions", &self.extensions())
            .finish()
    }
}

fn already_registered(extension: &str) -> TextxtractError {
    TextxtractError::usage(format!(
        "A handler is already registered for '.{}'; pass overwrite=true to replace it",
        extension
    ))
}

/// Global handler registry singleton.
pub static HANDLER_REGISTRY: Lazy<Arc<HandlerRegistry>> = Lazy::new(|| Arc::new(HandlerRegistry::with_defaults()));

/// Get the global handler registry.
pub fn get_handler_registry() -> Arc<HandlerRegistry> {
    HANDLER_REGISTRY.clone()
}

/// Register a handler factory in the global registry.
pub fn register_handler<F>(extension: &str, factory: F, overwrite: bool) -> Result<()>
where
    F: Fn() -> Result<Arc<dyn Handler>> + Send + Sync + 'static,
{
    HANDLER_REGISTRY.register(extension, factory, overwrite)
}

/// Extensions currently supported by the global registry.
pub fn supported_extensions() -> Vec<String> {
    HANDLER_REGISTRY.extensions()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::ExtractionContext;
    use crate::core::validation::ResolvedFile;
    use crate::plugins::Plugin;
    use crate::ErrorKind;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct FixedHandler {
        text: &'static str,
        shut_down: AtomicBool,
    }

    impl FixedHandler {
        fn new(text: &'static str) -> Self {
            Self {
                text,
                shut_down: AtomicBool::new(false),
            }
        }
    }

    impl Plugin for FixedHandler {
        fn name(&self) -> &str {
            "fixed-handler"
        }

        fn version(&self) -> String {
            "1.0.0".to_string()
        }

        fn initialize(&self) -> Result<()> {
            Ok(())
        }

        fn shutdown(&self) -> Result<()> {
            self.shut_down.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    impl Handler for FixedHandler {
        fn extract(&self, _file: &ResolvedFile, _ctx: &ExtractionContext) -> Result<String> {
            Ok(self.text.to_string())
        }

        fn supported_extensions(&self) -> &[&str] {
            &["fix"]
        }
    }

    fn fixed(text: &'static str) -> impl Fn() -> Result<Arc<dyn Handler>> + Send + Sync + 'static {
        move || Ok(Arc::new(FixedHandler::new(text)) as Arc<dyn Handler>)
    }

    #[test]
    fn test_validate_extension() {
        assert_eq!(validate_extension(".Fix").unwrap(), "fix");
        assert!(validate_extension("").is_err());
        assert!(validate_extension("...").is_err());
        assert!(validate_extension("a b").is_err());
        assert!(validate_extension("a/b").is_err());
    }

    #[test]
    fn test_register_and_resolve() {
        let registry = HandlerRegistry::new();
        registry.register("fix", fixed("one"), false).unwrap();

        let handler = registry.resolve(".FIX").unwrap();
        assert_eq!(handler.name(), "fixed-handler");
        assert_eq!(registry.extensions(), vec!["fix".to_string()]);
    }

    #[test]
    fn test_resolve_unregistered_is_not_supported() {
        let registry = HandlerRegistry::new();
        let err = registry.resolve("nope").err().unwrap();
        assert_eq!(err.kind(), ErrorKind::FileTypeNotSupported);
    }

    #[test]
    fn test_duplicate_registration_requires_overwrite() {
        let registry = HandlerRegistry::new();
        registry.register("fix", fixed("one"), false).unwrap();

        let err = registry.register("fix", fixed("two"), false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Usage);

        registry.register("fix", fixed("two"), true).unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_factory_runs_once() {
        let registry = HandlerRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        registry
            .register(
                "fix",
                move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(Arc::new(FixedHandler::new("x")) as Arc<dyn Handler>)
                },
                false,
            )
            .unwrap();

        assert!(!registry.is_constructed("fix"));
        let first = registry.resolve("fix").unwrap();
        let second = registry.resolve("fix").unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert!(registry.is_constructed("fix"));
    }

    #[test]
    fn test_failed_factory_is_retried() {
        let registry = HandlerRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        registry
            .register(
                "fix",
                move || {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(TextxtractError::extraction("decoder unavailable"))
                    } else {
                        Ok(Arc::new(FixedHandler::new("x")) as Arc<dyn Handler>)
                    }
                },
                false,
            )
            .unwrap();

        let err = registry.resolve("fix").err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Extraction);
        assert!(err.to_string().contains("(.fix)"));

        assert!(registry.resolve("fix").is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_overwrite_shuts_down_constructed_handler() {
        let registry = HandlerRegistry::new();
        let original = Arc::new(FixedHandler::new("old"));
        registry
            .register_instance("fix", original.clone() as Arc<dyn Handler>, false)
            .unwrap();

        registry.register("fix", fixed("new"), true).unwrap();
        assert!(original.shut_down.load(Ordering::SeqCst));
    }

    #[test]
    fn test_register_instance_respects_overwrite() {
        let registry = HandlerRegistry::new();
        registry.register("fix", fixed("one"), false).unwrap();

        let err = registry
            .register_instance("fix", Arc::new(FixedHandler::new("two")), false)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Usage);
        assert!(!registry.is_constructed("fix"));
    }

    #[test]
    fn test_unregister() {
        let registry = HandlerRegistry::new();
        let handler = Arc::new(FixedHandler::new("x"));
        registry
            .register_instance("fix", handler.clone() as Arc<dyn Handler>, false)
            .unwrap();

        assert!(registry.unregister(".fix"));
        assert!(handler.shut_down.load(Ordering::SeqCst));
        assert!(!registry.unregister("fix"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_default_extension_map() {
        let registry = HandlerRegistry::with_defaults();
        for ext in [
            "txt", "text", "pdf", "docx", "doc", "md", "rtf", "html", "htm", "csv", "json", "xml", "zip",
        ] {
            assert!(registry.is_supported(ext), "missing default handler for {}", ext);
        }
        assert!(!registry.is_constructed("pdf"));
    }

    #[test]
    fn test_reset_to_defaults() {
        let registry = HandlerRegistry::with_defaults();
        registry.register("fix", fixed("x"), false).unwrap();
        registry.unregister("pdf");

        registry.reset_to_defaults();
        assert!(!registry.is_supported("fix"));
        assert!(registry.is_supported("pdf"));
    }

    #[test]
    fn test_shutdown_all() {
        let registry = HandlerRegistry::new();
        let handler = Arc::new(FixedHandler::new("x"));
        registry
            .register_instance("fix", handler.clone() as Arc<dyn Handler>, false)
            .unwrap();

        registry.shutdown_all();
        assert!(handler.shut_down.load(Ordering::SeqCst));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_concurrent_resolve_constructs_once() {
        let registry = Arc::new(HandlerRegistry::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        registry
            .register(
                "fix",
                move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                    std::thread::sleep(std::time::Duration::from_millis(10));
                    Ok(Arc::new(FixedHandler::new("x")) as Arc<dyn Handler>)
                },
                false,
            )
            .unwrap();

        let threads: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.resolve("fix").map(|_| ()))
            })
            .collect();

        for thread in threads {
            thread.join().unwrap().unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

//! Base plugin trait definition.
//!
//! Handlers implement [`Plugin`] for identification and lifecycle hooks.

use crate::Result;

/// Lifecycle and metadata shared by every handler.
///
/// # Thread Safety
///
/// Handler instances are memoized in the registry and shared across concurrent
/// requests, so plugins must be `Send + Sync`.
///
/// # Example
///
/// ```rust
/// use textxtract::plugins::Plugin;
/// use textxtract::Result;
/// use std::sync::atomic::{AtomicBool, Ordering};
///
/// struct LineCounter {
///     ready: AtomicBool,
/// }
///
/// impl Plugin for LineCounter {
///     fn name(&self) -> &str {
///         "line-counter"
///     }
///
///     fn version(&self) -> String {
///         "1.0.0".to_string()
///     }
///
///     fn initialize(&self) -> Result<()> {
///         self.ready.store(true, Ordering::Release);
///         Ok(())
///     }
///
///     fn shutdown(&self) -> Result<()> {
///         self.ready.store(false, Ordering::Release);
///         Ok(())
///     }
/// }
/// ```
pub trait Plugin: Send + Sync {
    /// Kebab-case identifier, e.g. `"pdf-handler"`.
    fn name(&self) -> &str;

    fn version(&self) -> String;

    /// Called once, right after the registry constructs or receives the instance.
    fn initialize(&self) -> Result<()>;

    /// Called when the instance is replaced, unregistered or the registry is reset.
    fn shutdown(&self) -> Result<()>;

    fn description(&self) -> &str {
        ""
    }

    fn author(&self) -> &str {
        ""
    }
}

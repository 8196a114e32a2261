//! Format handler capability.

use crate::Result;
use crate::core::context::ExtractionContext;
use crate::core::validation::ResolvedFile;
use crate::plugins::Plugin;

/// Turns one resolved file of a given format into plain text.
///
/// Implementations may block on I/O or CPU-bound decoding; the async
/// orchestrator runs them on its worker pool.
///
/// # Errors
///
/// Return `InvalidFile` for structurally corrupt input and `Extraction` for any
/// other failure. Text is returned whole or not at all.
///
/// # Example
///
/// ```rust
/// use textxtract::plugins::{Handler, Plugin};
/// use textxtract::{ExtractionContext, ResolvedFile, Result};
///
/// struct ShoutHandler;
///
/// impl Plugin for ShoutHandler {
///     fn name(&self) -> &str { "shout-handler" }
///     fn version(&self) -> String { "1.0.0".to_string() }
///     fn initialize(&self) -> Result<()> { Ok(()) }
///     fn shutdown(&self) -> Result<()> { Ok(()) }
/// }
///
/// impl Handler for ShoutHandler {
///     fn extract(&self, file: &ResolvedFile, _ctx: &ExtractionContext) -> Result<String> {
///         let text = String::from_utf8_lossy(&file.read_bytes()?).to_uppercase();
///         Ok(text)
///     }
///
///     fn supported_extensions(&self) -> &[&str] {
///         &["shout"]
///     }
/// }
/// ```
pub trait Handler: Plugin {
    /// Extract the full text of `file` using the effective config in `ctx`.
    fn extract(&self, file: &ResolvedFile, ctx: &ExtractionContext) -> Result<String>;

    /// Extensions this handler is meant for, without leading dots.
    fn supported_extensions(&self) -> &[&str];
}

//! Handler plugin system.
//!
//! - [`Plugin`] - Lifecycle and metadata every handler carries
//! - [`Handler`] - Format-specific text extraction
//! - [`registry`] - Extension to handler mapping with lazy construction
//!
//! # Example: Custom Handler
//!
//! ```rust
//! use textxtract::plugins::{Handler, Plugin};
//! use textxtract::plugins::registry::HandlerRegistry;
//! use textxtract::{ExtractionContext, ResolvedFile, Result};
//! use std::sync::Arc;
//!
//! struct LogHandler;
//!
//! impl Plugin for LogHandler {
//!     fn name(&self) -> &str { "log-handler" }
//!     fn version(&self) -> String { "1.0.0".to_string() }
//!     fn initialize(&self) -> Result<()> { Ok(()) }
//!     fn shutdown(&self) -> Result<()> { Ok(()) }
//! }
//!
//! impl Handler for LogHandler {
//!     fn extract(&self, file: &ResolvedFile, _ctx: &ExtractionContext) -> Result<String> {
//!         Ok(String::from_utf8_lossy(&file.read_bytes()?).into_owned())
//!     }
//!
//!     fn supported_extensions(&self) -> &[&str] {
//!         &["log"]
//!     }
//! }
//!
//! let registry = HandlerRegistry::with_defaults();
//! registry.register("log", || Ok(Arc::new(LogHandler) as Arc<dyn Handler>), false)?;
//! assert!(registry.is_supported("log"));
//! # Ok::<(), textxtract::TextxtractError>(())
//! ```

mod handler;
pub mod registry;
mod traits;

pub use handler::Handler;
pub use registry::{HandlerFactory, HandlerRegistry, get_handler_registry, register_handler};
pub use traits::Plugin;

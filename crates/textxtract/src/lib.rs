//! Textxtract - plain-text extraction for heterogeneous documents
//!
//! Textxtract turns PDF, DOCX, DOC, RTF, HTML, Markdown, CSV, JSON, XML, plain
//! text and ZIP archives (recursively) into plain text through one handler
//! interface, offered both as a blocking and an async API.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use textxtract::{ConfigOverrides, SyncExtractor};
//!
//! # fn main() -> textxtract::Result<()> {
//! let extractor = SyncExtractor::with_config(ConfigOverrides::default().with_max_file_size(10 * 1024 * 1024))?;
//! let text = extractor.extract("report.pdf", None, None)?;
//! println!("{}", text);
//!
//! let text = extractor.extract(b"hello".to_vec(), Some("note.txt"), None)?;
//! assert_eq!(text, "hello");
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - **Core** (`core`): configuration, validation, the sync/async orchestrators and the worker pool
//! - **Plugins** (`plugins`): the [`Handler`](plugins::Handler) trait and the extension registry
//! - **Extractors** (`extractors`): built-in handlers, registered lazily
//! - **Extraction** (`extraction`): format decoding helpers, including recursive ZIP traversal
//!
//! Errors are always one of five kinds: usage, unsupported type, invalid file,
//! extraction failure or timeout (see [`ErrorKind`]).

#![deny(unsafe_code)]

/// Emit a tracing event at a level chosen at runtime.
macro_rules! log_at {
    ($level:expr, $($arg:tt)+) => {
        match $level {
            $crate::core::config::LogLevel::Trace => ::tracing::trace!($($arg)+),
            $crate::core::config::LogLevel::Debug => ::tracing::debug!($($arg)+),
            $crate::core::config::LogLevel::Info => ::tracing::info!($($arg)+),
            $crate::core::config::LogLevel::Warn => ::tracing::warn!($($arg)+),
            $crate::core::config::LogLevel::Error => ::tracing::error!($($arg)+),
        }
    };
}

pub mod core;
pub mod error;
pub mod extraction;
pub mod extractors;
pub mod plugins;
pub mod types;

pub use error::{ErrorKind, Result, TextxtractError};
pub use types::{ExtractionRequest, Source};

pub use core::async_extractor::{AsyncExtractor, extract_bytes, extract_file};
pub use core::config::{
    ArchiveConfig, ArchiveOverrides, ConfigOverrides, ExtractionConfig, LogLevel, global_defaults,
    reset_global_defaults, set_global_defaults,
};
pub use core::context::ExtractionContext;
pub use core::extractor::{SyncExtractor, extract_bytes_sync, extract_file_sync};
pub use core::lifecycle::ExtractionState;
pub use core::validation::ResolvedFile;

pub use plugins::registry::{
    HandlerRegistry, get_handler_registry, register_handler, supported_extensions,
};

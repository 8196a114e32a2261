//! Error types for textxtract.
//!
//! Every failed extraction surfaces exactly one [`TextxtractError`] variant:
//!
//! - `Usage` - Caller misuse (byte input without a filename, bad config keys,
//!   re-registering an extension without `overwrite`, using a shut-down extractor)
//! - `FileTypeNotSupported` - No handler is registered for the resolved extension
//! - `InvalidFile` - Missing, empty, oversized or corrupt input, and security
//!   violations such as ZIP path traversal or decompression bombs
//! - `Extraction` - A handler failed to decode the input (the cause is attached)
//! - `Timeout` - An async extraction exceeded its deadline
//!
//! Lower-level failures (I/O, decoder errors, handler panics) are always folded
//! into one of these variants with the original error kept as `source`.
//!
//! # Example
//!
//! ```rust
//! use textxtract::{Result, TextxtractError};
//!
//! fn read_note(path: &str) -> Result<String> {
//!     let content = std::fs::read_to_string(path)?;
//!
//!     if content.is_empty() {
//!         return Err(TextxtractError::invalid_file(format!("File is empty: {}", path)));
//!     }
//!
//!     Ok(content)
//! }
//! ```
use std::time::Duration;
use thiserror::Error;

/// Result type alias using `TextxtractError`.
pub type Result<T> = std::result::Result<T, TextxtractError>;

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for all textxtract operations.
#[derive(Debug, Error)]
pub enum TextxtractError {
    #[error("Usage error: {0}")]
    Usage(String),

    #[error("File type not supported: .{extension}")]
    FileTypeNotSupported { extension: String },

    #[error("Invalid file: {message}")]
    InvalidFile {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("Extraction error{}: {message}", extension_suffix(.extension))]
    Extraction {
        message: String,
        extension: Option<String>,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("Extraction timed out after {timeout:?}")]
    Timeout { timeout: Duration },
}

fn extension_suffix(extension: &Option<String>) -> String {
    extension.as_ref().map(|ext| format!(" (.{})", ext)).unwrap_or_default()
}

/// Stable discriminant of a [`TextxtractError`], independent of its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Usage,
    FileTypeNotSupported,
    InvalidFile,
    Extraction,
    Timeout,
}

impl From<std::io::Error> for TextxtractError {
    fn from(err: std::io::Error) -> Self {
        TextxtractError::Extraction {
            message: format!("I/O failure: {}", err),
            extension: None,
            source: Some(Box::new(err)),
        }
    }
}

macro_rules! error_constructor {
    ($name:ident, $variant:ident $(, $field:ident)*) => {
        pastey::paste! {
            #[doc = "Create a " $variant " error"]
            pub fn $name<S: Into<String>>(message: S) -> Self {
                Self::$variant {
                    message: message.into(),
                    $($field: None,)*
                    source: None,
                }
            }

            #[doc = "Create a " $variant " error with source"]
            pub fn [<$name _with_source>]<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
                message: S,
                source: E,
            ) -> Self {
                Self::$variant {
                    message: message.into(),
                    $($field: None,)*
                    source: Some(Box::new(source)),
                }
            }
        }
    };
}

impl TextxtractError {
    error_constructor!(invalid_file, InvalidFile);
    error_constructor!(extraction, Extraction, extension);

    /// Create a usage error.
    pub fn usage<S: Into<String>>(message: S) -> Self {
        Self::Usage(message.into())
    }

    /// Create an unsupported file type error for a normalized extension.
    pub fn unsupported<S: Into<String>>(extension: S) -> Self {
        Self::FileTypeNotSupported {
            extension: extension.into(),
        }
    }

    /// The variant of this error without its payload.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Usage(_) => ErrorKind::Usage,
            Self::FileTypeNotSupported { .. } => ErrorKind::FileTypeNotSupported,
            Self::InvalidFile { .. } => ErrorKind::InvalidFile,
            Self::Extraction { .. } => ErrorKind::Extraction,
            Self::Timeout { .. } => ErrorKind::Timeout,
        }
    }

    /// Attach the originating extension to an `Extraction` error that lacks one.
    ///
    /// Other variants pass through unchanged.
    pub fn with_extension(self, ext: &str) -> Self {
        match self {
            Self::Extraction {
                message,
                extension: None,
                source,
            } => Self::Extraction {
                message,
                extension: Some(ext.to_string()),
                source,
            },
            other => other,
        }
    }

    /// Prefix the message of `InvalidFile`/`Extraction` errors with extra context.
    pub(crate) fn context(self, prefix: &str) -> Self {
        match self {
            Self::InvalidFile { message, source } => Self::InvalidFile {
                message: format!("{}: {}", prefix, message),
                source,
            },
            Self::Extraction {
                message,
                extension,
                source,
            } => Self::Extraction {
                message: format!("{}: {}", prefix, message),
                extension,
                source,
            },
            other => other,
        }
    }
}

/// Render a panic payload captured from a handler into a readable reason.
pub(crate) fn panic_reason(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

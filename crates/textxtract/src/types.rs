//! Request types shared by the sync and async orchestrators.
use crate::core::config::ConfigOverrides;
use crate::{Result, TextxtractError};
use std::path::{Path, PathBuf};

/// Where the document comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// A file already on disk.
    Path(PathBuf),
    /// An in-memory buffer; needs a filename to resolve its extension.
    Bytes(Vec<u8>),
}

impl Source {
    pub fn is_bytes(&self) -> bool {
        matches!(self, Source::Bytes(_))
    }
}

impl From<PathBuf> for Source {
    fn from(path: PathBuf) -> Self {
        Source::Path(path)
    }
}

impl From<&Path> for Source {
    fn from(path: &Path) -> Self {
        Source::Path(path.to_path_buf())
    }
}

impl From<&PathBuf> for Source {
    fn from(path: &PathBuf) -> Self {
        Source::Path(path.clone())
    }
}

impl From<&str> for Source {
    fn from(path: &str) -> Self {
        Source::Path(PathBuf::from(path))
    }
}

impl From<String> for Source {
    fn from(path: String) -> Self {
        Source::Path(PathBuf::from(path))
    }
}

impl From<Vec<u8>> for Source {
    fn from(bytes: Vec<u8>) -> Self {
        Source::Bytes(bytes)
    }
}

impl From<&[u8]> for Source {
    fn from(bytes: &[u8]) -> Self {
        Source::Bytes(bytes.to_vec())
    }
}

/// One extraction call: the input, an optional filename and per-call overrides.
///
/// # Example
///
/// ```rust
/// use textxtract::ExtractionRequest;
///
/// let request = ExtractionRequest::bytes(b"hello".to_vec(), "note.txt");
/// assert!(request.check_shape().is_ok());
///
/// let missing_name = ExtractionRequest::new(b"hello".to_vec());
/// assert!(missing_name.check_shape().is_err());
/// ```
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    pub source: Source,
    pub filename: Option<String>,
    pub overrides: ConfigOverrides,
}

impl ExtractionRequest {
    pub fn new(source: impl Into<Source>) -> Self {
        Self {
            source: source.into(),
            filename: None,
            overrides: ConfigOverrides::default(),
        }
    }

    pub fn path(path: impl AsRef<Path>) -> Self {
        Self::new(path.as_ref())
    }

    pub fn bytes(bytes: impl Into<Vec<u8>>, filename: impl Into<String>) -> Self {
        Self::new(Source::Bytes(bytes.into())).with_filename(filename)
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Reject requests that cannot be resolved regardless of content.
    ///
    /// A byte buffer without a (non-blank) filename is a [`TextxtractError::Usage`] error.
    pub fn check_shape(&self) -> Result<()> {
        if self.source.is_bytes() {
            let named = self.filename.as_deref().is_some_and(|name| !name.trim().is_empty());
            if !named {
                return Err(TextxtractError::usage(
                    "filename is required when extracting from bytes",
                ));
            }
        }
        Ok(())
    }
}

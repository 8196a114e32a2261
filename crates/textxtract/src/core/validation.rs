//! Input validation and resolution to an on-disk file.
//!
//! Every check here runs before any handler sees the input: existence, kind,
//! emptiness, extension and size. Byte buffers are materialized into a
//! process-exclusive temporary file only after all checks pass.
use crate::core::config::ExtractionConfig;
use crate::plugins::registry::HandlerRegistry;
use crate::types::{ExtractionRequest, Source};
use crate::{Result, TextxtractError};
use parking_lot::Mutex;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempPath;

/// Lower-case an extension and strip any leading dots.
pub fn normalize_extension(extension: &str) -> String {
    extension.trim().trim_start_matches('.').to_lowercase()
}

/// Extension of a file name, normalized. `None` when the name has no extension.
pub fn extension_of(name: impl AsRef<Path>) -> Option<String> {
    name.as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .map(normalize_extension)
        .filter(|ext| !ext.is_empty())
}

/// A validated input that handlers can read from disk.
///
/// When built from a byte buffer the file is temporary and is deleted by
/// [`ResolvedFile::release`], or on drop at the latest.
#[derive(Debug)]
pub struct ResolvedFile {
    path: PathBuf,
    extension: String,
    size: u64,
    temporary: bool,
    temp: Mutex<Option<TempPath>>,
}

impl ResolvedFile {
    /// Wrap an existing file. Used for top-level paths and archive entries.
    pub fn from_path(path: impl Into<PathBuf>, extension: impl Into<String>, size: u64) -> Self {
        Self {
            path: path.into(),
            extension: extension.into(),
            size,
            temporary: false,
            temp: Mutex::new(None),
        }
    }

    fn from_temp(temp: TempPath, extension: String, size: u64) -> Self {
        Self {
            path: temp.to_path_buf(),
            extension,
            size,
            temporary: true,
            temp: Mutex::new(Some(temp)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn is_temporary(&self) -> bool {
        self.temporary
    }

    /// Read the whole file into memory.
    pub fn read_bytes(&self) -> Result<Vec<u8>> {
        std::fs::read(&self.path).map_err(|e| {
            TextxtractError::extraction_with_source(format!("Failed to read {}", self.path.display()), e)
        })
    }

    /// Delete the temporary backing file now. Idempotent; a no-op for non-temporary files.
    pub fn release(&self) -> Result<()> {
        let temp = self.temp.lock().take();
        if let Some(temp) = temp {
            temp.close()?;
            tracing::trace!(path = %self.path.display(), "Released temporary file");
        }
        Ok(())
    }
}

/// Validate a request against the effective config and registry.
pub fn validate_request(
    request: &ExtractionRequest,
    config: &ExtractionConfig,
    registry: &HandlerRegistry,
) -> Result<ResolvedFile> {
    request.check_shape()?;
    validate(&request.source, request.filename.as_deref(), config, registry)
}

/// Resolve `source` into a [`ResolvedFile`].
///
/// `filename`, when given, decides the extension even for path sources.
///
/// # Errors
///
/// - `InvalidFile` if the path is missing or a directory, the buffer is empty,
///   the name has no extension, or the size exceeds `max_file_size`
/// - `FileTypeNotSupported` if no handler is registered for the extension
/// - `Usage` if a byte buffer comes without a filename
pub fn validate(
    source: &Source,
    filename: Option<&str>,
    config: &ExtractionConfig,
    registry: &HandlerRegistry,
) -> Result<ResolvedFile> {
    match source {
        Source::Path(path) => {
            if !path.exists() {
                return Err(TextxtractError::invalid_file(format!(
                    "File not found: {}",
                    path.display()
                )));
            }

            let metadata = std::fs::metadata(path).map_err(|e| {
                TextxtractError::invalid_file_with_source(format!("Cannot stat {}", path.display()), e)
            })?;

            if metadata.is_dir() {
                return Err(TextxtractError::invalid_file(format!(
                    "Path is a directory, not a file: {}",
                    path.display()
                )));
            }

            let name = filename.map(PathBuf::from).unwrap_or_else(|| path.clone());
            let extension = require_extension(&name)?;
            check_size(metadata.len(), config)?;
            check_supported(&extension, registry)?;

            Ok(ResolvedFile::from_path(path.clone(), extension, metadata.len()))
        }
        Source::Bytes(bytes) => {
            let filename = filename
                .filter(|name| !name.trim().is_empty())
                .ok_or_else(|| TextxtractError::usage("filename is required when extracting from bytes"))?;

            if bytes.is_empty() {
                return Err(TextxtractError::invalid_file(format!("Input for '{}' is empty", filename)));
            }

            let extension = require_extension(Path::new(filename))?;
            let size = bytes.len() as u64;
            check_size(size, config)?;
            check_supported(&extension, registry)?;

            let temp = write_temp(bytes, &extension, config)?;
            Ok(ResolvedFile::from_temp(temp, extension, size))
        }
    }
}

fn require_extension(name: &Path) -> Result<String> {
    extension_of(name).ok_or_else(|| {
        TextxtractError::invalid_file(format!(
            "Cannot determine file type: '{}' has no extension",
            name.display()
        ))
    })
}

fn check_size(size: u64, config: &ExtractionConfig) -> Result<()> {
    if size > config.max_file_size {
        return Err(TextxtractError::invalid_file(format!(
            "File size {} bytes exceeds the maximum of {} bytes",
            size, config.max_file_size
        )));
    }
    Ok(())
}

fn check_supported(extension: &str, registry: &HandlerRegistry) -> Result<()> {
    if registry.is_supported(extension) {
        Ok(())
    } else {
        Err(TextxtractError::unsupported(extension))
    }
}

fn write_temp(bytes: &[u8], extension: &str, config: &ExtractionConfig) -> Result<TempPath> {
    let root = config.temp_root();
    let suffix = format!(".{}", extension);

    let mut file = tempfile::Builder::new()
        .prefix("textxtract-")
        .suffix(&suffix)
        .tempfile_in(&root)
        .map_err(|e| {
            TextxtractError::extraction_with_source(
                format!("Failed to create temporary file in {}", root.display()),
                e,
            )
        })?;

    file.write_all(bytes)?;
    file.flush()?;

    Ok(file.into_temp_path())
}

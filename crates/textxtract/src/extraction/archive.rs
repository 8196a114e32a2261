//! Recursive ZIP traversal.
//!
//! Entries are visited in central directory order. Each supported entry is
//! written into a private scratch directory and dispatched through the same
//! [`HandlerRegistry`](crate::plugins::registry::HandlerRegistry) used for
//! top-level files, with a nested [`ExtractionContext`] so that archives inside
//! archives share one cumulative byte budget and count toward the depth limit.

use crate::core::context::ExtractionContext;
use crate::core::extractor::dispatch;
use crate::core::validation::{ResolvedFile, extension_of};
use crate::{Result, TextxtractError};
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use zip::ZipArchive;

/// Separator placed between the text of consecutive entries.
pub const ENTRY_SEPARATOR: &str = "\n\n";

/// Normalize a raw entry name to a relative path inside the extraction root.
///
/// Backslashes count as separators, `.` segments are dropped and `..` pops a
/// segment. Returns `Ok(None)` for names that normalize to the root itself.
///
/// # Errors
///
/// `InvalidFile` for absolute names, drive prefixes, NUL bytes, and any `..`
/// that would climb above the root.
pub fn normalize_entry_path(name: &str) -> Result<Option<PathBuf>> {
    let escapes = || TextxtractError::invalid_file(format!("ZIP entry '{}' escapes the extraction root", name));

    if name.contains('\0') {
        return Err(TextxtractError::invalid_file(format!(
            "ZIP entry name contains a NUL byte: {:?}",
            name
        )));
    }

    let unified = name.replace('\\', "/");
    let bytes = unified.as_bytes();
    let has_drive = bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':';
    if unified.starts_with('/') || has_drive {
        return Err(escapes());
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(escapes());
                }
            }
            other => segments.push(other),
        }
    }

    if segments.is_empty() {
        return Ok(None);
    }
    Ok(Some(segments.iter().collect()))
}

fn check_compression_ratio(name: &str, uncompressed: u64, compressed: u64, max_ratio: f64) -> Result<()> {
    if compressed == 0 {
        return Ok(());
    }
    let ratio = uncompressed as f64 / compressed as f64;
    if ratio > max_ratio {
        return Err(TextxtractError::invalid_file(format!(
            "ZIP entry '{}' has a suspicious compression ratio of {:.0}:1 (limit {:.0}:1)",
            name, ratio, max_ratio
        )));
    }
    Ok(())
}

/// Copy at most `declared` bytes of an entry to `target`.
///
/// Fails with `InvalidFile` if the entry inflates past its declared size.
fn write_entry(entry: &mut impl Read, target: &Path, name: &str, declared: u64) -> Result<u64> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut out = File::create(target)?;
    let written = io::copy(&mut entry.take(declared.saturating_add(1)), &mut out)?;
    if written > declared {
        return Err(TextxtractError::invalid_file(format!(
            "ZIP entry '{}' inflates beyond its declared size of {} bytes",
            name, declared
        )));
    }
    Ok(written)
}

/// Extract and concatenate the text of every supported entry of the ZIP at `path`.
///
/// # Errors
///
/// - `InvalidFile` if the archive is unreadable, nests deeper than
///   `archive.max_depth`, has more than `archive.max_entries` entries, contains
///   an entry escaping the root, exceeds the compression ratio or the cumulative
///   uncompressed ceiling
/// - any error raised while extracting an entry, prefixed with the entry name
#[tracing::instrument(skip_all, fields(depth = ctx.depth()))]
pub fn extract_zip(path: &Path, ctx: &ExtractionContext) -> Result<String> {
    let limits = &ctx.config().archive;
    if ctx.depth() > limits.max_depth {
        return Err(TextxtractError::invalid_file(format!(
            "Archive nesting exceeds the maximum depth of {}",
            limits.max_depth
        )));
    }

    let reader = BufReader::new(File::open(path)?);
    let mut archive = ZipArchive::new(reader)
        .map_err(|e| TextxtractError::invalid_file_with_source(format!("Failed to read ZIP archive: {}", e), e))?;

    if archive.len() > limits.max_entries {
        return Err(TextxtractError::invalid_file(format!(
            "ZIP archive has {} entries, more than the limit of {}",
            archive.len(),
            limits.max_entries
        )));
    }

    let scratch = tempfile::Builder::new()
        .prefix("textxtract-zip-")
        .tempdir_in(ctx.config().temp_root())?;
    let root = scratch.path();
    let nested = ctx.nested();
    let mut texts: Vec<String> = Vec::new();

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).map_err(|e| {
            TextxtractError::invalid_file_with_source(format!("Failed to read ZIP entry #{}: {}", index, e), e)
        })?;
        if entry.is_dir() {
            continue;
        }

        let name = entry.name().to_string();
        let Some(relative) = normalize_entry_path(&name)? else {
            continue;
        };
        let target = root.join(&relative);
        if !target.starts_with(root) {
            return Err(TextxtractError::invalid_file(format!(
                "ZIP entry '{}' escapes the extraction root",
                name
            )));
        }

        let extension = match extension_of(&relative) {
            Some(ext) if ctx.registry().is_supported(&ext) => ext,
            other => {
                tracing::debug!(entry = %name, extension = ?other, "Skipping unsupported archive entry");
                continue;
            }
        };

        check_compression_ratio(&name, entry.size(), entry.compressed_size(), limits.max_compression_ratio)?;

        let declared = entry.size();
        nested.reserve_archive_bytes(declared)?;
        let written = write_entry(&mut entry, &target, &name, declared)?;
        drop(entry);

        tracing::trace!(entry = %name, bytes = written, "Extracting archive entry");

        let file = ResolvedFile::from_path(&target, extension.as_str(), written);
        let text = ctx
            .registry()
            .resolve(&extension)
            .and_then(|handler| dispatch(handler.as_ref(), &file, &nested))
            .map_err(|e| e.context(&format!("ZIP entry '{}'", name)))?;

        if let Err(e) = fs::remove_file(&target) {
            tracing::debug!(entry = %name, error = %e, "Failed to remove extracted entry");
        }

        let text = text.trim();
        if !text.is_empty() {
            texts.push(text.to_string());
        }
    }

    if let Err(e) = scratch.close() {
        tracing::warn!(error = %e, "Failed to remove archive scratch directory");
    }

    Ok(texts.join(ENTRY_SEPARATOR))
}

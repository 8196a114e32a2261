//! ZIP archive handler.

use crate::Result;
use crate::core::context::ExtractionContext;
use crate::core::validation::ResolvedFile;
use crate::extraction::archive::extract_zip;
use crate::plugins::{Handler, Plugin};

/// ZIP archive handler.
///
/// Extracts every supported entry through the registry the archive itself was
/// resolved from and joins the results with a blank line. Limits come from the
/// `[archive]` configuration section.
pub struct ArchiveHandler;

impl ArchiveHandler {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ArchiveHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for ArchiveHandler {
    fn name(&self) -> &str {
        "zip-archive-handler"
    }

    fn version(&self) -> String {
        env!("CARGO_PKG_VERSION").to_string()
    }

    fn initialize(&self) -> Result<()> {
        Ok(())
    }

    fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    fn description(&self) -> &str {
        "Extracts text from supported entries of ZIP archives, recursively"
    }
}

impl Handler for ArchiveHandler {
    fn extract(&self, file: &ResolvedFile, ctx: &ExtractionContext) -> Result<String> {
        extract_zip(file.path(), ctx)
    }

    fn supported_extensions(&self) -> &[&str] {
        &["zip"]
    }
}

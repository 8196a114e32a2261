//! DOCX document handler.

use crate::core::context::ExtractionContext;
use crate::core::validation::ResolvedFile;
use crate::extraction::docx::docx_to_text;
use crate::plugins::{Handler, Plugin};
use crate::Result;

/// DOCX handler.
///
/// Collects body paragraphs, tables, headers, footers, notes and text boxes.
/// Each XML part may decompress to at most the effective archive ceiling.
pub struct DocxHandler;

impl DocxHandler {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DocxHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for DocxHandler {
    fn name(&self) -> &str {
        "docx-handler"
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
        "Extracts text from Word documents (.docx)"
    }
}

impl Handler for DocxHandler {
    fn extract(&self, file: &ResolvedFile, ctx: &ExtractionContext) -> Result<String> {
        let bytes = file.read_bytes()?;
        docx_to_text(&bytes, ctx.config().effective_archive_ceiling())
    }

    fn supported_extensions(&self) -> &[&str] {
        &["docx"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use crate::core::config::ExtractionConfig;
    use crate::plugins::registry::HandlerRegistry;
    use std::sync::Arc;
    use tempfile::tempdir;

    #[test]
    fn test_corrupt_docx_is_invalid_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.docx");
        std::fs::write(&path, b"PK\x03\x04truncated").unwrap();

        let ctx = ExtractionContext::new(Arc::new(ExtractionConfig::default()), Arc::new(HandlerRegistry::new()));
        let file = ResolvedFile::from_path(&path, "docx", 13);
        let err = DocxHandler::new().extract(&file, &ctx).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFile);
    }

    #[test]
    fn test_plugin_metadata() {
        let handler = DocxHandler::new();
        assert_eq!(handler.name(), "docx-handler");
        assert_eq!(handler.supported_extensions(), &["docx"]);
    }
}

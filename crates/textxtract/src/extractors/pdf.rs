//! PDF document handler.

use crate::core::context::ExtractionContext;
use crate::core::validation::ResolvedFile;
use crate::extraction::text::tidy_lines;
use crate::plugins::{Handler, Plugin};
use crate::{Result, TextxtractError};
use lopdf::Document;

/// PDF handler.
///
/// Reads the text layer of every page in order with `lopdf`. Scanned pages
/// without a text layer yield nothing; there is no OCR fallback.
pub struct PdfHandler;

impl PdfHandler {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PdfHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for PdfHandler {
    fn name(&self) -> &str {
        "pdf-handler"
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
        "Extracts the text layer of PDF documents"
    }
}

impl Handler for PdfHandler {
    fn extract(&self, file: &ResolvedFile, _ctx: &ExtractionContext) -> Result<String> {
        let bytes = file.read_bytes()?;
        pdf_to_text(&bytes)
    }

    fn supported_extensions(&self) -> &[&str] {
        &["pdf"]
    }
}

/// Extract the text layer of a PDF, pages in document order.
///
/// # Errors
///
/// - `InvalidFile` if the document cannot be parsed or is encrypted
/// - `Extraction` if a page's content stream cannot be decoded
pub fn pdf_to_text(bytes: &[u8]) -> Result<String> {
    let document = Document::load_mem(bytes)
        .map_err(|e| TextxtractError::invalid_file_with_source(format!("Failed to parse PDF: {}", e), e))?;

    if document.is_encrypted() {
        return Err(TextxtractError::invalid_file(
            "PDF is encrypted; password-protected documents are not supported",
        ));
    }

    let pages: Vec<u32> = document.get_pages().keys().copied().collect();
    if pages.is_empty() {
        return Ok(String::new());
    }

    tracing::trace!(pages = pages.len(), "Extracting PDF text layer");

    let text = document
        .extract_text(&pages)
        .map_err(|e| TextxtractError::extraction_with_source(format!("Failed to extract PDF text: {}", e), e))?;

    Ok(tidy_lines(&text))
}

//! HTML document handler.

use crate::core::context::ExtractionContext;
use crate::core::validation::ResolvedFile;
use crate::extraction::html::html_to_text;
use crate::extraction::text::decode_text;
use crate::plugins::{Handler, Plugin};
use crate::Result;

/// HTML handler for `.html` and `.htm`.
pub struct HtmlHandler;

impl HtmlHandler {
    pub fn new() -> Self {
        Self
    }
}

impl Default for HtmlHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for HtmlHandler {
    fn name(&self) -> &str {
        "html-handler"
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
        "Extracts visible text from HTML pages"
    }
}

impl Handler for HtmlHandler {
    fn extract(&self, file: &ResolvedFile, ctx: &ExtractionContext) -> Result<String> {
        let bytes = file.read_bytes()?;
        let html = decode_text(&bytes, ctx.config().encoding_for(file.extension()))?;
        html_to_text(&html)
    }

    fn supported_extensions(&self) -> &[&str] {
        &["html", "htm"]
    }
}

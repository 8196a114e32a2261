//! Markdown handler.

use crate::Result;
use crate::core::context::ExtractionContext;
use crate::core::validation::ResolvedFile;
use crate::extraction::markdown::markdown_to_text;
use crate::extraction::text::decode_text;
use crate::plugins::{Handler, Plugin};

/// Markdown handler.
///
/// Renders `.md`/`.markdown` files to plain text with `pulldown-cmark`,
/// dropping markup and raw HTML.
pub struct MarkdownHandler;

impl MarkdownHandler {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MarkdownHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for MarkdownHandler {
    fn name(&self) -> &str {
        "markdown-handler"
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
        "Renders Markdown documents to plain text"
    }
}

impl Handler for MarkdownHandler {
    fn extract(&self, file: &ResolvedFile, ctx: &ExtractionContext) -> Result<String> {
        let bytes = file.read_bytes()?;
        let source = decode_text(&bytes, ctx.config().encoding_for(file.extension()))?;
        Ok(markdown_to_text(&source))
    }

    fn supported_extensions(&self) -> &[&str] {
        &["md", "markdown"]
    }
}

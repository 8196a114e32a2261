//! Plain text handler.

use crate::Result;
use crate::core::context::ExtractionContext;
use crate::core::validation::ResolvedFile;
use crate::extraction::text::decode_text;
use crate::plugins::{Handler, Plugin};

/// Plain text handler.
///
/// Decodes `.txt`/`.text` files with the effective encoding
/// (`handlers.<ext>.encoding`, falling back to `encoding`).
pub struct TextHandler;

impl TextHandler {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TextHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for TextHandler {
    fn name(&self) -> &str {
        "text-handler"
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
        "Extracts content from plain text files"
    }
}

impl Handler for TextHandler {
    fn extract(&self, file: &ResolvedFile, ctx: &ExtractionContext) -> Result<String> {
        let bytes = file.read_bytes()?;
        let encoding = ctx.config().encoding_for(file.extension());
        let text = decode_text(&bytes, encoding)?;
        Ok(text.trim_end_matches('\n').to_string())
    }

    fn supported_extensions(&self) -> &[&str] {
        &["txt", "text"]
    }
}

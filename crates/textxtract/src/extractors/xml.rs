//! XML document handler.

use crate::core::context::ExtractionContext;
use crate::core::validation::ResolvedFile;
use crate::extraction::xml::xml_to_text;
use crate::plugins::{Handler, Plugin};
use crate::Result;

/// XML handler; one text node per line.
pub struct XmlHandler;

impl XmlHandler {
    pub fn new() -> Self {
        Self
    }
}

impl Default for XmlHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for XmlHandler {
    fn name(&self) -> &str {
        "xml-handler"
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
}

impl Handler for XmlHandler {
    fn extract(&self, file: &ResolvedFile, _ctx: &ExtractionContext) -> Result<String> {
        let bytes = file.read_bytes()?;
        xml_to_text(&bytes)
    }

    fn supported_extensions(&self) -> &[&str] {
        &["xml"]
    }
}

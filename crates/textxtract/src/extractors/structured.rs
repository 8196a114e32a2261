//! JSON and CSV handlers.

use crate::core::context::ExtractionContext;
use crate::core::validation::ResolvedFile;
use crate::extraction::structured::{csv_to_text, json_to_text};
use crate::extraction::text::decode_text;
use crate::plugins::{Handler, Plugin};
use crate::{Result, TextxtractError};

/// JSON handler.
///
/// Emits one `path: value` line per scalar, in document order.
pub struct JsonHandler;

impl JsonHandler {
    pub fn new() -> Self {
        Self
    }
}

impl Default for JsonHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for JsonHandler {
    fn name(&self) -> &str {
        "json-handler"
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
        "Flattens JSON documents into path/value lines"
    }
}

impl Handler for JsonHandler {
    fn extract(&self, file: &ResolvedFile, ctx: &ExtractionContext) -> Result<String> {
        let bytes = file.read_bytes()?;
        let source = decode_text(&bytes, ctx.config().encoding_for(file.extension()))?;
        json_to_text(&source)
    }

    fn supported_extensions(&self) -> &[&str] {
        &["json"]
    }
}

/// CSV handler.
///
/// Options: `handlers.csv.delimiter` (single character, default `,`).
pub struct CsvHandler;

impl CsvHandler {
    pub fn new() -> Self {
        Self
    }

    fn delimiter(file: &ResolvedFile, ctx: &ExtractionContext) -> Result<char> {
        let Some(raw) = ctx.config().handler_option_str(file.extension(), "delimiter") else {
            return Ok(',');
        };

        let raw = if raw == "\\t" { "\t" } else { raw };
        let mut chars = raw.chars();
        match (chars.next(), chars.next()) {
            (Some(delimiter), None) if delimiter != '"' && delimiter != '\n' => Ok(delimiter),
            _ => Err(TextxtractError::extraction(format!(
                "CSV delimiter must be a single character other than a quote or newline, got {:?}",
                raw
            ))),
        }
    }
}

impl Default for CsvHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for CsvHandler {
    fn name(&self) -> &str {
        "csv-handler"
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
        "Extracts cell text from delimited files"
    }
}

impl Handler for CsvHandler {
    fn extract(&self, file: &ResolvedFile, ctx: &ExtractionContext) -> Result<String> {
        let delimiter = Self::delimiter(file, ctx)?;
        let bytes = file.read_bytes()?;
        let source = decode_text(&bytes, ctx.config().encoding_for(file.extension()))?;
        csv_to_text(&source, delimiter)
    }

    fn supported_extensions(&self) -> &[&str] {
        &["csv"]
    }
}

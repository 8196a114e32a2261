//! Legacy Word (`.doc`) handler.
//!
//! Word 97-2003 files are OLE2 compound documents. Without a full compound file
//! reader the handler recovers the body by scanning for runs of readable text,
//! first as UTF-16LE (how Word stores most text) and then as 8-bit characters,
//! keeping whichever pass covers more of the body.
//!
//! The UTF-16 pass only accepts a fixed set of scripts and breaks a run when the
//! script changes, so random byte pairs in binary sectors do not pass for
//! ideographic text.

use crate::core::context::ExtractionContext;
use crate::core::validation::ResolvedFile;
use crate::extraction::text::tidy_lines;
use crate::plugins::{Handler, Plugin};
use crate::{Result, TextxtractError};

const OLE2_MAGIC: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
const MIN_RUN_CHARS: usize = 4;
/// Ideographic and Hangul runs must be longer; short ones are mostly noise.
const MIN_IDEOGRAPHIC_RUN_CHARS: usize = 8;
const MIN_ALNUM_RATIO: f64 = 0.6;

/// Legacy Word document handler.
pub struct DocHandler;

impl DocHandler {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DocHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for DocHandler {
    fn name(&self) -> &str {
        "doc-handler"
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
        "Recovers text runs from Word 97-2003 documents"
    }
}

impl Handler for DocHandler {
    fn extract(&self, file: &ResolvedFile, _ctx: &ExtractionContext) -> Result<String> {
        let bytes = file.read_bytes()?;
        doc_to_text(&bytes)
    }

    fn supported_extensions(&self) -> &[&str] {
        &["doc"]
    }
}

/// Recover readable text from an OLE2 Word document.
///
/// # Errors
///
/// `InvalidFile` if the bytes are not an OLE2 compound document.
pub fn doc_to_text(bytes: &[u8]) -> Result<String> {
    if bytes.len() < OLE2_MAGIC.len() || bytes[..OLE2_MAGIC.len()] != OLE2_MAGIC {
        return Err(TextxtractError::invalid_file(
            "Not a Word 97-2003 document: missing OLE2 signature",
        ));
    }

    let body = &bytes[OLE2_MAGIC.len()..];
    let wide = utf16_runs(body);
    let narrow = ansi_runs(body);

    // Weighted by body bytes covered: a UTF-16 character spans two.
    let chosen = if 2 * text_weight(&wide) >= text_weight(&narrow) {
        wide
    } else {
        narrow
    };

    Ok(tidy_lines(&chosen.join("\n")))
}

fn text_weight(runs: &[String]) -> usize {
    runs.iter().map(|run| run.chars().count()).sum()
}

fn is_text_char(c: char) -> bool {
    !c.is_control() || c == '\t'
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Script {
    Neutral,
    Latin,
    Hebrew,
    Arabic,
    Cjk,
    Hangul,
}

impl Script {
    fn min_run_chars(self) -> usize {
        match self {
            Script::Cjk | Script::Hangul => MIN_IDEOGRAPHIC_RUN_CHARS,
            _ => MIN_RUN_CHARS,
        }
    }
}

/// Script class of a UTF-16 character, `None` outside the accepted ranges.
fn script_of(c: char) -> Option<Script> {
    if !is_text_char(c) {
        return None;
    }
    if c.is_ascii() {
        return Some(if c.is_ascii_alphabetic() { Script::Latin } else { Script::Neutral });
    }
    match c as u32 {
        0x00A0..=0x00BF | 0x00D7 | 0x00F7 | 0x2010..=0x2027 | 0x2030..=0x205E => Some(Script::Neutral),
        0x00C0..=0x024F | 0x0370..=0x03FF | 0x0400..=0x04FF => Some(Script::Latin),
        0x0590..=0x05FF => Some(Script::Hebrew),
        0x0600..=0x06FF => Some(Script::Arabic),
        0x3000..=0x30FF | 0x4E00..=0x9FFF => Some(Script::Cjk),
        0xAC00..=0xD7A3 => Some(Script::Hangul),
        _ => None,
    }
}

fn accept_run(run: &str) -> bool {
    accept_run_of(run, MIN_RUN_CHARS)
}

fn accept_run_of(run: &str, min_chars: usize) -> bool {
    let run = run.trim();
    let total = run.chars().count();
    if total < min_chars || !run.chars().any(char::is_alphabetic) {
        return false;
    }
    let alnum = run.chars().filter(|c| c.is_alphanumeric() || c.is_whitespace()).count();
    alnum as f64 / total as f64 >= MIN_ALNUM_RATIO
}

fn flush(current: &mut String, runs: &mut Vec<String>) {
    if accept_run(current) {
        runs.push(current.trim().to_string());
    }
    current.clear();
}

fn close_run(current: &mut String, script: &mut Script, runs: &mut Vec<String>) {
    if accept_run_of(current, script.min_run_chars()) {
        runs.push(current.trim().to_string());
    }
    current.clear();
    *script = Script::Neutral;
}

/// Runs of UTF-16LE code units at even offsets that stay within one script.
/// Paragraph marks (`\r`) split runs.
fn utf16_runs(body: &[u8]) -> Vec<String> {
    let mut runs = Vec::new();
    let mut current = String::new();
    let mut script = Script::Neutral;

    let units = body.chunks_exact(2).map(|pair| u16::from_le_bytes([pair[0], pair[1]]));
    for decoded in char::decode_utf16(units) {
        match decoded.ok().and_then(|c| script_of(c).map(|class| (c, class))) {
            Some((c, Script::Neutral)) => current.push(c),
            Some((c, class)) => {
                if script != Script::Neutral && script != class {
                    close_run(&mut current, &mut script, &mut runs);
                }
                script = class;
                current.push(c);
            }
            None => close_run(&mut current, &mut script, &mut runs),
        }
    }
    close_run(&mut current, &mut script, &mut runs);
    runs
}

/// Runs of printable Windows-1252 bytes.
fn ansi_runs(body: &[u8]) -> Vec<String> {
    let mut runs = Vec::new();
    let mut current = String::new();

    for &byte in body {
        let printable = matches!(byte, b'\t' | 0x20..=0x7E | 0xA0..=0xFF);
        if printable {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(std::slice::from_ref(&byte));
            current.push_str(&decoded);
        } else {
            flush(&mut current, &mut runs);
        }
    }
    flush(&mut current, &mut runs);
    runs
}

//! RTF (Rich Text Format) handler.
//!
//! A small group-aware tokenizer: destinations that carry no body text (font and
//! color tables, stylesheets, document info, pictures, headers/footers and any
//! `\*` destination) are skipped, `\par`/`\line` become newlines, `\'hh` escapes
//! decode as Windows-1252 and `\uN` escapes honor the `\ucN` fallback count.

use crate::core::context::ExtractionContext;
use crate::core::validation::ResolvedFile;
use crate::extraction::text::tidy_lines;
use crate::plugins::{Handler, Plugin};
use crate::{Result, TextxtractError};
use std::iter::Peekable;
use std::str::Chars;

const SKIPPED_DESTINATIONS: &[&str] = &[
    "fonttbl",
    "colortbl",
    "stylesheet",
    "info",
    "pict",
    "object",
    "header",
    "headerl",
    "headerr",
    "headerf",
    "footer",
    "footerl",
    "footerr",
    "footerf",
    "listtable",
    "listoverridetable",
    "rsidtbl",
    "generator",
    "xmlnstbl",
    "themedata",
    "colorschememapping",
    "datastore",
    "latentstyles",
    "filetbl",
    "revtbl",
    "fldinst",
    "bkmkstart",
    "bkmkend",
];

/// RTF handler.
pub struct RtfHandler;

impl RtfHandler {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RtfHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for RtfHandler {
    fn name(&self) -> &str {
        "rtf-handler"
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
        "Extracts body text from RTF documents"
    }
}

impl Handler for RtfHandler {
    fn extract(&self, file: &ResolvedFile, _ctx: &ExtractionContext) -> Result<String> {
        let bytes = file.read_bytes()?;
        let content = String::from_utf8_lossy(&bytes);
        rtf_to_text(&content)
    }

    fn supported_extensions(&self) -> &[&str] {
        &["rtf"]
    }
}

#[inline]
fn hex_digit_to_u8(c: char) -> Option<u8> {
    c.to_digit(16).map(|d| d as u8)
}

#[inline]
fn parse_hex_byte(h1: char, h2: char) -> Option<u8> {
    let high = hex_digit_to_u8(h1)?;
    let low = hex_digit_to_u8(h2)?;
    Some((high << 4) | low)
}

fn decode_cp1252(byte: u8) -> char {
    let buf = [byte];
    let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&buf);
    decoded.chars().next().unwrap_or('?')
}

/// Parse a control word after the backslash: letters, then an optional signed
/// numeric parameter, then an optional single space delimiter.
fn parse_control_word(chars: &mut Peekable<Chars<'_>>) -> (String, Option<i32>) {
    let mut word = String::new();
    while let Some(&c) = chars.peek() {
        if c.is_ascii_alphabetic() {
            word.push(c);
            chars.next();
        } else {
            break;
        }
    }

    let mut digits = String::new();
    if chars.peek() == Some(&'-') {
        digits.push('-');
        chars.next();
    }
    while let Some(&c) = chars.peek() {
        if c.is_ascii_digit() {
            digits.push(c);
            chars.next();
        } else {
            break;
        }
    }

    if chars.peek() == Some(&' ') {
        chars.next();
    }

    (word, digits.parse::<i32>().ok())
}

#[derive(Clone, Copy)]
struct Group {
    skip: bool,
    unicode_fallback: usize,
}

struct RtfState {
    out: String,
    stack: Vec<Group>,
    group: Group,
    pending_fallback: usize,
    high_surrogate: Option<u32>,
}

impl RtfState {
    fn emit(&mut self, c: char) {
        if self.pending_fallback > 0 {
            self.pending_fallback -= 1;
            return;
        }
        if !self.group.skip {
            self.out.push(c);
        }
    }

    fn emit_unicode(&mut self, value: i32) {
        let code = if value < 0 { (value + 65536) as u32 } else { value as u32 };

        let decoded = match (self.high_surrogate.take(), code) {
            (None, 0xD800..=0xDBFF) => {
                self.high_surrogate = Some(code);
                None
            }
            (Some(high), 0xDC00..=0xDFFF) => char::from_u32(0x10000 + ((high - 0xD800) << 10) + (code - 0xDC00)),
            (_, code) => char::from_u32(code),
        };

        if let Some(c) = decoded
            && !self.group.skip
        {
            self.out.push(c);
        }
        self.pending_fallback = self.group.unicode_fallback;
    }

    fn control_word(&mut self, word: &str, param: Option<i32>) {
        if SKIPPED_DESTINATIONS.contains(&word) {
            self.group.skip = true;
            return;
        }

        match word {
            "par" | "line" | "sect" | "page" | "row" => self.emit_raw('\n'),
            "tab" | "cell" => self.emit_raw('\t'),
            "emdash" => self.emit_raw('\u{2014}'),
            "endash" => self.emit_raw('\u{2013}'),
            "bullet" => self.emit_raw('\u{2022}'),
            "lquote" => self.emit_raw('\u{2018}'),
            "rquote" => self.emit_raw('\u{2019}'),
            "ldblquote" => self.emit_raw('\u{201C}'),
            "rdblquote" => self.emit_raw('\u{201D}'),
            "u" => {
                if let Some(value) = param {
                    self.emit_unicode(value);
                }
            }
            "uc" => self.group.unicode_fallback = param.unwrap_or(1).max(0) as usize,
            _ => {}
        }
    }

    fn emit_raw(&mut self, c: char) {
        self.pending_fallback = 0;
        if !self.group.skip {
            self.out.push(c);
        }
    }
}

/// Extract body text from an RTF document.
///
/// # Errors
///
/// `InvalidFile` if the content does not start with `{\rtf`.
pub fn rtf_to_text(content: &str) -> Result<String> {
    let body = content.trim_start_matches('\u{feff}').trim_start();
    if !body.starts_with("{\\rtf") {
        return Err(TextxtractError::invalid_file("Not an RTF document: missing {\\rtf header"));
    }

    let mut state = RtfState {
        out: String::with_capacity(body.len() / 2),
        stack: Vec::new(),
        group: Group {
            skip: false,
            unicode_fallback: 1,
        },
        pending_fallback: 0,
        high_surrogate: None,
    };
    let mut chars = body.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '{' => {
                state.stack.push(state.group);
                state.pending_fallback = 0;
            }
            '}' => {
                if let Some(parent) = state.stack.pop() {
                    state.group = parent;
                }
                state.pending_fallback = 0;
            }
            '\\' => match chars.peek().copied() {
                Some(c @ ('\\' | '{' | '}')) => {
                    chars.next();
                    state.emit(c);
                }
                Some('\'') => {
                    chars.next();
                    if let (Some(h1), Some(h2)) = (chars.next(), chars.next())
                        && let Some(byte) = parse_hex_byte(h1, h2)
                    {
                        state.emit(decode_cp1252(byte));
                    }
                }
                Some('*') => {
                    chars.next();
                    state.group.skip = true;
                }
                Some('~') => {
                    chars.next();
                    state.emit(' ');
                }
                Some('_') => {
                    chars.next();
                    state.emit('-');
                }
                Some('\n') | Some('\r') => {
                    chars.next();
                    state.emit_raw('\n');
                }
                Some(c) if c.is_ascii_alphabetic() => {
                    let (word, param) = parse_control_word(&mut chars);
                    state.control_word(&word, param);
                }
                Some(_) => {
                    chars.next();
                }
                None => {}
            },
            '\r' | '\n' => {}
            other => state.emit(other),
        }
    }

    Ok(tidy_lines(&state.out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_simple_paragraphs() {
        let rtf = r"{\rtf1\ansi\deff0{\fonttbl{\f0 Times New Roman;}}\f0\fs24 Hello\par World\par}";
        assert_eq!(rtf_to_text(rtf).unwrap(), "Hello\nWorld");
    }

    #[test]
    fn test_skips_destinations() {
        let rtf = r"{\rtf1{\colortbl;\red0\green0\blue0;}{\info{\title Secret}}{\*\generator Writer;}Body\par}";
        assert_eq!(rtf_to_text(rtf).unwrap(), "Body");
    }

    #[test]
    fn test_hex_escapes_use_cp1252() {
        let rtf = r"{\rtf1 caf\'e9 \'93quoted\'94\par}";
        assert_eq!(rtf_to_text(rtf).unwrap(), "café \u{201C}quoted\u{201D}");
    }

    #[test]
    fn test_unicode_escape_skips_fallback() {
        let rtf = r"{\rtf1\uc1 snow\u9731?man\par}";
        assert_eq!(rtf_to_text(rtf).unwrap(), "snow\u{2603}man");
    }

    #[test]
    fn test_negative_unicode_and_surrogates() {
        let rtf = r"{\rtf1 \u-10179?\u-8704?\par}";
        assert_eq!(rtf_to_text(rtf).unwrap(), "\u{1F600}");
    }

    #[test]
    fn test_escaped_braces_and_tabs() {
        let rtf = r"{\rtf1 a\{b\}\tab c\\d\par}";
        assert_eq!(rtf_to_text(rtf).unwrap(), "a{b}\tc\\d");
    }

    #[test]
    fn test_not_rtf_is_invalid_file() {
        let err = rtf_to_text("plain text").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFile);
    }

    #[test]
    fn test_parse_hex_byte() {
        assert_eq!(parse_hex_byte('e', '9'), Some(0xe9));
        assert_eq!(parse_hex_byte('F', 'f'), Some(0xff));
        assert_eq!(parse_hex_byte('g', '0'), None);
    }
}

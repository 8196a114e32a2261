//! Charset decoding for text-like formats.
use crate::{Result, TextxtractError};
use encoding_rs::Encoding;

/// Decode `bytes` strictly with `encoding`.
///
/// A byte order mark, when present, wins over the configured encoding and is
/// stripped. Line endings are normalized to `\n`.
///
/// # Errors
///
/// `Extraction` if the input is not valid in the chosen encoding.
///
/// # Example
///
/// ```rust
/// use textxtract::extraction::text::decode_text;
///
/// let text = decode_text(b"caf\xe9", encoding_rs::WINDOWS_1252).unwrap();
/// assert_eq!(text, "café");
/// assert!(decode_text(b"caf\xe9", encoding_rs::UTF_8).is_err());
/// ```
pub fn decode_text(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (encoding, body) = match Encoding::for_bom(bytes) {
        Some((bom_encoding, bom_len)) => (bom_encoding, &bytes[bom_len..]),
        None => (encoding, bytes),
    };

    let decoded = encoding
        .decode_without_bom_handling_and_without_replacement(body)
        .ok_or_else(|| {
            TextxtractError::extraction(format!("Input is not valid {} text", encoding.name()))
        })?;

    Ok(normalize_line_endings(&decoded))
}

/// Decode leniently, replacing malformed sequences with U+FFFD.
pub fn decode_lossy(bytes: &[u8], encoding: &'static Encoding) -> String {
    let (decoded, _, _) = encoding.decode(bytes);
    normalize_line_endings(&decoded)
}

pub fn normalize_line_endings(text: &str) -> String {
    if text.contains('\r') {
        text.replace("\r\n", "\n").replace('\r', "\n")
    } else {
        text.to_string()
    }
}

/// Collapse runs of blank lines and trim trailing whitespace on every line.
pub fn tidy_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0;

    for line in text.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }

    out.trim().to_string()
}

//! XML text extraction.
//!
//! Streams the document with `quick-xml`, collecting character data (text,
//! CDATA, entity references) per node and emitting one trimmed node per line.
//! Entities declared in a DOCTYPE are not expanded.
//!
//! # Example
//!
//! ```rust
//! use textxtract::extraction::xml::xml_to_text;
//!
//! # fn example() -> textxtract::Result<()> {
//! let xml = b"<root><item>Fish &amp; Chips</item><item>Tea</item></root>";
//! assert_eq!(xml_to_text(xml)?, "Fish & Chips\nTea");
//! # Ok(())
//! # }
//! ```
use crate::{Result, TextxtractError};
use quick_xml::Reader;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::Event;

fn flush(node: &mut String, lines: &mut Vec<String>) {
    let trimmed = node.trim();
    if !trimmed.is_empty() {
        lines.push(trimmed.to_string());
    }
    node.clear();
}

/// Extract text nodes from an XML document.
///
/// # Errors
///
/// `InvalidFile` if the document is malformed.
pub fn xml_to_text(xml_bytes: &[u8]) -> Result<String> {
    let mut reader = Reader::from_reader(xml_bytes);
    reader.config_mut().trim_text(false);

    let mut lines = Vec::new();
    let mut node = String::new();
    let mut buf = Vec::new();
    let mut open_elements = 0usize;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(_)) => {
                open_elements += 1;
                flush(&mut node, &mut lines);
            }
            Ok(Event::End(_)) => {
                open_elements = open_elements.saturating_sub(1);
                flush(&mut node, &mut lines);
            }
            Ok(Event::Empty(_)) => flush(&mut node, &mut lines),
            Ok(Event::Text(e)) => node.push_str(&String::from_utf8_lossy(e.as_ref())),
            Ok(Event::CData(e)) => node.push_str(&String::from_utf8_lossy(&e)),
            Ok(Event::GeneralRef(e)) => {
                let name = String::from_utf8_lossy(e.as_ref()).into_owned();
                match e.resolve_char_ref() {
                    Ok(Some(ch)) => node.push(ch),
                    Ok(None) => match resolve_predefined_entity(&name) {
                        Some(resolved) => node.push_str(resolved),
                        None => {
                            node.push('&');
                            node.push_str(&name);
                            node.push(';');
                        }
                    },
                    Err(err) => {
                        return Err(TextxtractError::invalid_file(format!(
                            "Invalid character reference '&{};' at position {}: {}",
                            name,
                            reader.buffer_position(),
                            err
                        )));
                    }
                }
            }
            Ok(Event::Eof) if open_elements > 0 => {
                return Err(TextxtractError::invalid_file(format!(
                    "XML ended with {} unclosed element(s)",
                    open_elements
                )));
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(TextxtractError::invalid_file(format!(
                    "XML parsing error at position {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
            _ => {}
        }
        buf.clear();
    }
    flush(&mut node, &mut lines);

    Ok(lines.join("\n"))
}

//! DOCX (Office Open XML) text extraction.
//!
//! Walks the package with `zip` and streams each WordprocessingML part with
//! `quick-xml`. Output order is: body paragraphs, tables (one line per row,
//! cells joined with `" | "`), headers, footers, footnotes, endnotes and text
//! boxes. A paragraph whose exact text was already emitted is not repeated.

use crate::{Result, TextxtractError};
use once_cell::sync::Lazy;
use quick_xml::Reader;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesRef, Event};
use regex::Regex;
use std::collections::HashSet;
use std::io::{Cursor, Read};
use zip::ZipArchive;

const DOCUMENT_PART: &str = "word/document.xml";
const FOOTNOTES_PART: &str = "word/footnotes.xml";
const ENDNOTES_PART: &str = "word/endnotes.xml";

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static DOT_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.{2,}").expect("valid regex"));
static SPACE_BEFORE_PUNCT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+([.!?,:;])").expect("valid regex"));
static SENTENCE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"([.!?])\s*([A-Z])").expect("valid regex"));

/// Cell paragraphs, per cell, per row.
type Table = Vec<Vec<Vec<String>>>;

#[derive(Default)]
struct TableBuilder {
    rows: Table,
    row: Vec<Vec<String>>,
    cell: Vec<String>,
}

/// Text collected from one WordprocessingML part.
#[derive(Default)]
struct PartText {
    paragraphs: Vec<String>,
    tables: Vec<Table>,
    text_boxes: Vec<String>,
}

impl PartText {
    /// Paragraphs, then table cell paragraphs in reading order.
    fn all_paragraphs(self) -> impl Iterator<Item = String> {
        let cells = self.tables.into_iter().flatten().flatten().flatten();
        self.paragraphs.into_iter().chain(cells).chain(self.text_boxes)
    }
}

#[derive(Default)]
struct Collector {
    parts: Vec<String>,
    seen: HashSet<String>,
}

impl Collector {
    /// Record `text` unless it is blank or was already seen; returns whether it was new.
    fn admit(&mut self, text: &str) -> bool {
        let text = text.trim();
        !text.is_empty() && self.seen.insert(text.to_string())
    }

    fn push(&mut self, text: &str) {
        if self.admit(text) {
            self.parts.push(text.trim().to_string());
        }
    }

    fn push_labeled(&mut self, label: &str, text: &str) {
        if self.admit(text) {
            self.parts.push(format!("[{}: {}]", label, text.trim()));
        }
    }

    fn push_table(&mut self, table: Table) {
        for row in table {
            let mut cells = Vec::new();
            for cell in row {
                let fresh: Vec<String> = cell
                    .into_iter()
                    .filter(|paragraph| self.admit(paragraph))
                    .map(|paragraph| paragraph.trim().to_string())
                    .collect();
                if !fresh.is_empty() {
                    cells.push(fresh.join(" "));
                }
            }
            if !cells.is_empty() {
                self.parts.push(cells.join(" | "));
            }
        }
    }
}

/// Extract text from DOCX bytes.
///
/// `max_part_size` bounds the decompressed size of each XML part read.
///
/// # Errors
///
/// - `InvalidFile` if the bytes are not a ZIP package, `word/document.xml` is
///   missing, a part exceeds `max_part_size` or contains malformed XML
/// - `Extraction` if a part cannot be read
pub fn docx_to_text(bytes: &[u8], max_part_size: u64) -> Result<String> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| TextxtractError::invalid_file_with_source(format!("Failed to open DOCX as ZIP: {}", e), e))?;

    let document = read_part(&mut archive, DOCUMENT_PART, max_part_size)?
        .ok_or_else(|| TextxtractError::invalid_file(format!("DOCX package is missing {}", DOCUMENT_PART)))?;
    let body = parse_part(&document)?;

    let mut collector = Collector::default();
    for paragraph in &body.paragraphs {
        collector.push(paragraph);
    }
    for table in body.tables {
        collector.push_table(table);
    }

    for prefix in ["word/header", "word/footer"] {
        for name in part_names(&archive, prefix) {
            if let Some(xml) = read_part(&mut archive, &name, max_part_size)? {
                for paragraph in parse_part(&xml)?.all_paragraphs() {
                    collector.push(&paragraph);
                }
            }
        }
    }

    for (part, label) in [(FOOTNOTES_PART, "Footnote"), (ENDNOTES_PART, "Endnote")] {
        if let Some(xml) = read_part(&mut archive, part, max_part_size)? {
            for paragraph in parse_part(&xml)?.all_paragraphs() {
                collector.push_labeled(label, &paragraph);
            }
        }
    }

    for text_box in &body.text_boxes {
        collector.push_labeled("TextBox", text_box);
    }

    Ok(finish(&collector.parts))
}

fn finish(parts: &[String]) -> String {
    let cleaned: Vec<String> = parts
        .iter()
        .map(|part| clean_part(part))
        .filter(|part| !part.is_empty())
        .collect();
    let joined = cleaned.join("\n");
    SENTENCE_BREAK.replace_all(&joined, "$1\n$2").trim().to_string()
}

/// Normalize whitespace, drop dot leaders and spaces before punctuation.
fn clean_part(text: &str) -> String {
    let text = WHITESPACE.replace_all(text, " ");
    let text = DOT_RUNS.replace_all(&text, " ");
    let text = SPACE_BEFORE_PUNCT.replace_all(&text, "$1");
    text.trim().to_string()
}

/// Header or footer part names, sorted so `header1.xml` precedes `header2.xml`.
fn part_names(archive: &ZipArchive<Cursor<&[u8]>>, prefix: &str) -> Vec<String> {
    let mut names: Vec<String> = archive
        .file_names()
        .filter(|name| name.starts_with(prefix) && name.ends_with(".xml") && !name.contains("/_rels/"))
        .map(str::to_string)
        .collect();
    names.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
    names
}

fn read_part(archive: &mut ZipArchive<Cursor<&[u8]>>, name: &str, max_part_size: u64) -> Result<Option<Vec<u8>>> {
    let entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => {
            return Err(TextxtractError::invalid_file_with_source(
                format!("Failed to open {} in DOCX package: {}", name, e),
                e,
            ));
        }
    };

    let mut content = Vec::new();
    entry
        .take(max_part_size.saturating_add(1))
        .read_to_end(&mut content)
        .map_err(|e| TextxtractError::extraction_with_source(format!("Failed to read {}: {}", name, e), e))?;

    if content.len() as u64 > max_part_size {
        return Err(TextxtractError::invalid_file(format!(
            "{} decompresses to more than {} bytes",
            name, max_part_size
        )));
    }

    Ok(Some(content))
}

fn push_reference(target: &mut String, reference: &BytesRef<'_>) {
    if let Ok(Some(ch)) = reference.resolve_char_ref() {
        target.push(ch);
        return;
    }
    let name = String::from_utf8_lossy(reference.as_ref());
    match resolve_predefined_entity(&name) {
        Some(resolved) => target.push_str(resolved),
        None => {
            target.push('&');
            target.push_str(&name);
            target.push(';');
        }
    }
}

/// Stream one WordprocessingML part.
///
/// Paragraphs nest when a text box sits inside a run, so open paragraphs are
/// kept on a stack and each closed paragraph is routed by its innermost
/// container: text box, table cell or body.
fn parse_part(xml: &[u8]) -> Result<PartText> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);

    let mut out = PartText::default();
    let mut paragraphs: Vec<String> = Vec::new();
    let mut tables: Vec<TableBuilder> = Vec::new();
    let mut text_box_depth = 0usize;
    let mut in_text = false;
    let mut buf = Vec::new();

    loop {
        let event = reader.read_event_into(&mut buf).map_err(|e| {
            TextxtractError::invalid_file(format!(
                "Malformed DOCX XML at position {}: {}",
                reader.buffer_position(),
                e
            ))
        })?;

        match event {
            Event::Start(e) => match e.local_name().as_ref() {
                b"p" => paragraphs.push(String::new()),
                b"t" => in_text = true,
                b"tbl" => tables.push(TableBuilder::default()),
                b"tr" => {
                    if let Some(table) = tables.last_mut() {
                        table.row.clear();
                    }
                }
                b"tc" => {
                    if let Some(table) = tables.last_mut() {
                        table.cell.clear();
                    }
                }
                b"txbxContent" => text_box_depth += 1,
                _ => {}
            },
            Event::Empty(e) => {
                if matches!(e.local_name().as_ref(), b"tab" | b"br" | b"cr")
                    && let Some(paragraph) = paragraphs.last_mut()
                {
                    paragraph.push(' ');
                }
            }
            Event::Text(e) if in_text => {
                if let Some(paragraph) = paragraphs.last_mut() {
                    paragraph.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Event::GeneralRef(e) if in_text => {
                if let Some(paragraph) = paragraphs.last_mut() {
                    push_reference(paragraph, &e);
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => {
                    let closed = paragraphs.pop().map(|p| p.trim().to_string());
                    if let Some(paragraph) = closed.filter(|p| !p.is_empty()) {
                        if text_box_depth > 0 {
                            out.text_boxes.push(paragraph);
                        } else if let Some(table) = tables.last_mut() {
                            table.cell.push(paragraph);
                        } else {
                            out.paragraphs.push(paragraph);
                        }
                    }
                }
                b"tc" => {
                    if let Some(table) = tables.last_mut() {
                        let cell = std::mem::take(&mut table.cell);
                        table.row.push(cell);
                    }
                }
                b"tr" => {
                    if let Some(table) = tables.last_mut() {
                        let row = std::mem::take(&mut table.row);
                        table.rows.push(row);
                    }
                }
                b"tbl" => {
                    if let Some(table) = tables.pop()
                        && !table.rows.is_empty()
                    {
                        out.tables.push(table.rows);
                    }
                }
                b"txbxContent" => text_box_depth = text_box_depth.saturating_sub(1),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    const W_NS: &str = r#"xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main""#;

    fn package(parts: &[(&str, String)]) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut buffer);
            for (name, content) in parts {
                zip.start_file(*name, SimpleFileOptions::default()).unwrap();
                zip.write_all(content.as_bytes()).unwrap();
            }
            zip.finish().unwrap();
        }
        buffer.into_inner()
    }

    fn document(body: &str) -> String {
        format!(r#"<?xml version="1.0" encoding="UTF-8"?><w:document {}><w:body>{}</w:body></w:document>"#, W_NS, body)
    }

    fn para(text: &str) -> String {
        format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", text)
    }

    #[test]
    fn test_paragraphs_in_order() {
        let bytes = package(&[(DOCUMENT_PART, document(&format!("{}{}", para("first line"), para("second line"))))]);
        assert_eq!(docx_to_text(&bytes, u64::MAX).unwrap(), "first line\nsecond line");
    }

    #[test]
    fn test_runs_join_within_paragraph() {
        let body = r#"<w:p><w:r><w:t xml:space="preserve">Hello </w:t></w:r><w:r><w:t>world</w:t></w:r></w:p>"#;
        let bytes = package(&[(DOCUMENT_PART, document(body))]);
        assert_eq!(docx_to_text(&bytes, u64::MAX).unwrap(), "Hello world");
    }

    #[test]
    fn test_tables_follow_body_with_pipe_cells() {
        let table = format!(
            "<w:tbl><w:tr><w:tc>{}</w:tc><w:tc>{}</w:tc></w:tr><w:tr><w:tc>{}</w:tc><w:tc>{}</w:tc></w:tr></w:tbl>",
            para("name"),
            para("role"),
            para("ada"),
            para("engineer")
        );
        let body = format!("{}{}{}", para("intro"), table, para("outro"));
        let bytes = package(&[(DOCUMENT_PART, document(&body))]);
        assert_eq!(
            docx_to_text(&bytes, u64::MAX).unwrap(),
            "intro\noutro\nname | role\nada | engineer"
        );
    }

    #[test]
    fn test_duplicates_emitted_once() {
        let body = format!("{}{}{}", para("repeat"), para("other"), para("repeat"));
        let bytes = package(&[(DOCUMENT_PART, document(&body))]);
        assert_eq!(docx_to_text(&bytes, u64::MAX).unwrap(), "repeat\nother");
    }

    #[test]
    fn test_headers_footers_and_notes() {
        let header = format!(r#"<w:hdr {}>{}</w:hdr>"#, W_NS, para("header text"));
        let footer = format!(r#"<w:ftr {}>{}</w:ftr>"#, W_NS, para("footer text"));
        let footnotes = format!(
            r#"<w:footnotes {}><w:footnote w:id="1">{}</w:footnote></w:footnotes>"#,
            W_NS,
            para("see source")
        );
        let endnotes = format!(
            r#"<w:endnotes {}><w:endnote w:id="1">{}</w:endnote></w:endnotes>"#,
            W_NS,
            para("closing remark")
        );
        let bytes = package(&[
            (DOCUMENT_PART, document(&para("body"))),
            ("word/header1.xml", header),
            ("word/footer1.xml", footer),
            (FOOTNOTES_PART, footnotes),
            (ENDNOTES_PART, endnotes),
        ]);
        assert_eq!(
            docx_to_text(&bytes, u64::MAX).unwrap(),
            "body\nheader text\nfooter text\n[Footnote: see source]\n[Endnote: closing remark]"
        );
    }

    #[test]
    fn test_text_box_content_is_labeled() {
        let body = format!(
            "<w:p><w:r><w:t>anchor</w:t></w:r><w:r><w:pict><v:shape><v:textbox><w:txbxContent>{}</w:txbxContent></v:textbox></v:shape></w:pict></w:r></w:p>",
            para("boxed words")
        );
        let xml = format!(
            r#"<w:document {} xmlns:v="urn:schemas-microsoft-com:vml"><w:body>{}</w:body></w:document>"#,
            W_NS, body
        );
        let bytes = package(&[(DOCUMENT_PART, xml)]);
        assert_eq!(docx_to_text(&bytes, u64::MAX).unwrap(), "anchor\n[TextBox: boxed words]");
    }

    #[test]
    fn test_cleaning_rules() {
        let body = format!("{}{}", para("Contents.......3"), para("Done . Next part"));
        let bytes = package(&[(DOCUMENT_PART, document(&body))]);
        assert_eq!(docx_to_text(&bytes, u64::MAX).unwrap(), "Contents 3\nDone.\nNext part");
    }

    #[test]
    fn test_entities_in_text() {
        let bytes = package(&[(DOCUMENT_PART, document(&para("R&amp;D &#8211; lab")))]);
        assert_eq!(docx_to_text(&bytes, u64::MAX).unwrap(), "R&D \u{2013} lab");
    }

    #[test]
    fn test_not_a_zip_is_invalid_file() {
        let err = docx_to_text(b"definitely not a zip", u64::MAX).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFile);
    }

    #[test]
    fn test_missing_document_part_is_invalid_file() {
        let bytes = package(&[("word/styles.xml", "<styles/>".to_string())]);
        let err = docx_to_text(&bytes, u64::MAX).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFile);
    }

    #[test]
    fn test_oversized_part_is_invalid_file() {
        let bytes = package(&[(DOCUMENT_PART, document(&para("some words")))]);
        let err = docx_to_text(&bytes, 16).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFile);
    }
}

//! HTML to plain text.
//!
//! HTML is first converted to Markdown with `html-to-markdown-rs` and then
//! rendered to text, so block structure survives as blank lines while markup
//! is dropped.
//!
//! # Example
//!
//! ```rust
//! use textxtract::extraction::html::html_to_text;
//!
//! # fn example() -> textxtract::Result<()> {
//! let html = r#"<h1>Title</h1><p>This is <strong>bold</strong> text.</p>"#;
//! let text = html_to_text(html)?;
//!
//! assert!(text.contains("Title"));
//! assert!(text.contains("This is bold text."));
//! # Ok(())
//! # }
//! ```
use crate::error::panic_reason;
use crate::extraction::markdown::markdown_to_text;
use crate::{Result, TextxtractError};
use html_to_markdown_rs::{ConversionOptions, PreprocessingOptions, convert as convert_html};
use std::collections::HashMap;
use std::thread;

const HTML_CONVERSION_STACK_SIZE_BYTES: usize = 16 * 1024 * 1024;

/// Deepest element nesting accepted before conversion.
pub const MAX_HTML_NESTING_DEPTH: usize = 512;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source", "track", "wbr",
];

/// Elements the parser closes implicitly when a sibling opens.
const IMPLIED_END_ELEMENTS: &[&str] = &[
    "p", "li", "dt", "dd", "tr", "td", "th", "option", "optgroup", "rt", "rp",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

fn conversion_options() -> ConversionOptions {
    ConversionOptions {
        extract_metadata: false,
        preprocessing: PreprocessingOptions {
            enabled: false,
            ..Default::default()
        },
        ..Default::default()
    }
}

fn find_from(haystack: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle))
        .map(|pos| from + pos)
}

/// Upper bound of the element nesting depth, from a linear scan of the tags.
///
/// End tags only close elements that are open, so stray end tags cannot hide depth.
pub fn html_nesting_depth(html: &str) -> usize {
    let bytes = html.as_bytes();
    let mut open: HashMap<String, usize> = HashMap::new();
    let mut depth = 0usize;
    let mut deepest = 0usize;
    let mut pos = 0usize;

    while let Some(offset) = bytes[pos..].iter().position(|&b| b == b'<') {
        let start = pos + offset + 1;
        let Some(&next) = bytes.get(start) else {
            break;
        };

        if bytes[start..].starts_with(b"!--") {
            pos = find_from(bytes, start + 3, b"-->").map_or(bytes.len(), |end| end + 3);
            continue;
        }
        if next == b'!' || next == b'?' {
            pos = find_from(bytes, start, b">").map_or(bytes.len(), |end| end + 1);
            continue;
        }

        let closing = next == b'/';
        let name_start = if closing { start + 1 } else { start };
        let name_len = bytes[name_start..]
            .iter()
            .take_while(|b| b.is_ascii_alphanumeric() || **b == b'-' || **b == b':')
            .count();
        if name_len == 0 || !bytes[name_start].is_ascii_alphabetic() {
            pos = start;
            continue;
        }
        let name = html[name_start..name_start + name_len].to_ascii_lowercase();
        let Some(tag_end) = find_from(bytes, name_start + name_len, b">") else {
            break;
        };
        pos = tag_end + 1;

        if closing {
            if let Some(count) = open.get_mut(&name)
                && *count > 0
            {
                *count -= 1;
                depth -= 1;
            }
            continue;
        }

        if RAW_TEXT_ELEMENTS.contains(&name.as_str()) {
            let close = format!("</{}", name);
            pos = find_from(bytes, pos, close.as_bytes()).unwrap_or(bytes.len());
            continue;
        }

        let self_closing = bytes[..tag_end].ends_with(b"/");
        if self_closing || VOID_ELEMENTS.contains(&name.as_str()) || IMPLIED_END_ELEMENTS.contains(&name.as_str()) {
            continue;
        }

        *open.entry(name).or_default() += 1;
        depth += 1;
        deepest = deepest.max(depth);
    }

    deepest
}

fn convert_html_with_options(html: &str, options: ConversionOptions) -> Result<String> {
    convert_html(html, Some(options))
        .map_err(|e| TextxtractError::extraction(format!("Failed to convert HTML: {}", e)))
}

/// Deeply nested documents recurse past small thread stacks (tokio blocking
/// threads get 2 MiB), so every conversion runs on a dedicated thread.
fn run_on_dedicated_stack<T, F>(job: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    let handle = thread::Builder::new()
        .name("textxtract-html-conversion".to_string())
        .stack_size(HTML_CONVERSION_STACK_SIZE_BYTES)
        .spawn(job)
        .map_err(|err| TextxtractError::extraction(format!("Failed to spawn HTML conversion thread: {}", err)))?;

    match handle.join() {
        Ok(result) => result,
        Err(panic) => Err(TextxtractError::extraction(format!(
            "HTML conversion panicked: {}",
            panic_reason(panic.as_ref())
        ))),
    }
}

/// Convert HTML to Markdown.
///
/// # Errors
///
/// `InvalidFile` when elements nest deeper than [`MAX_HTML_NESTING_DEPTH`].
pub fn convert_html_to_markdown(html: &str) -> Result<String> {
    let depth = html_nesting_depth(html);
    if depth > MAX_HTML_NESTING_DEPTH {
        return Err(TextxtractError::invalid_file(format!(
            "HTML nests {} elements deep (limit {})",
            depth, MAX_HTML_NESTING_DEPTH
        )));
    }

    let options = conversion_options();
    let html = html.to_string();
    run_on_dedicated_stack(move || convert_html_with_options(&html, options))
}

/// Convert HTML to plain text.
pub fn html_to_text(html: &str) -> Result<String> {
    let markdown = convert_html_to_markdown(html)?;
    Ok(markdown_to_text(&markdown))
}

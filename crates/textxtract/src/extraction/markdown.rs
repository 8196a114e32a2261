//! Render Markdown to plain text.
use crate::extraction::text::tidy_lines;
use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};

fn ensure_line_break(text: &mut String) {
    if !text.is_empty() && !text.ends_with('\n') {
        text.push('\n');
    }
}

/// Strip Markdown markup, keeping text content with one block per line.
///
/// Table cells are joined with `" | "`, raw HTML is dropped and blocks are
/// separated by at most one blank line.
///
/// # Example
///
/// ```rust
/// use textxtract::extraction::markdown::markdown_to_text;
///
/// let text = markdown_to_text("# Title\n\nSome *bold* text.\n\n- one\n- two\n");
/// assert_eq!(text, "Title\n\nSome bold text.\n\none\ntwo");
/// ```
pub fn markdown_to_text(markdown: &str) -> String {
    let options = Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_TASKLISTS;
    let parser = Parser::new_ext(markdown, options);

    let mut text = String::with_capacity(markdown.len());
    let mut cells_in_row = 0usize;

    for event in parser {
        match event {
            Event::Text(s) | Event::Code(s) => text.push_str(&s),
            Event::SoftBreak | Event::HardBreak => text.push('\n'),
            Event::FootnoteReference(s) => {
                text.push('[');
                text.push_str(&s);
                text.push(']');
            }
            Event::Rule => {
                ensure_line_break(&mut text);
                text.push('\n');
            }
            Event::Start(Tag::TableHead | Tag::TableRow) => cells_in_row = 0,
            Event::Start(Tag::TableCell) => {
                if cells_in_row > 0 {
                    text.push_str(" | ");
                }
                cells_in_row += 1;
            }
            Event::Start(Tag::List(_) | Tag::Item) => ensure_line_break(&mut text),
            Event::End(TagEnd::TableHead | TagEnd::TableRow | TagEnd::Item | TagEnd::List(_)) => {
                ensure_line_break(&mut text)
            }
            Event::End(
                TagEnd::Paragraph
                | TagEnd::Heading(_)
                | TagEnd::CodeBlock
                | TagEnd::BlockQuote(_)
                | TagEnd::Table,
            ) => {
                ensure_line_break(&mut text);
                text.push('\n');
            }
            _ => {}
        }
    }

    tidy_lines(&text)
}

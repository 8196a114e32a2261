//! Built-in handlers.
//!
//! Every built-in extension is registered with a lazy factory, so a handler is
//! only constructed when a file of its type is first extracted. Extensions whose
//! decoder is compiled out stay registered; their factory fails with an
//! `Extraction` error naming the missing cargo feature.

use crate::plugins::registry::{HandlerFactory, HandlerRegistry};
use crate::plugins::Handler;
use crate::{Result, TextxtractError};
use std::sync::Arc;

pub mod doc;
pub mod rtf;
pub mod structured;
pub mod text;

#[cfg(feature = "archives")]
pub mod archive;

#[cfg(feature = "office")]
pub mod docx;

#[cfg(feature = "html")]
pub mod html;

#[cfg(feature = "office")]
pub mod markdown;

#[cfg(feature = "pdf")]
pub mod pdf;

#[cfg(feature = "xml")]
pub mod xml;

pub use doc::DocHandler;
pub use rtf::RtfHandler;
pub use structured::{CsvHandler, JsonHandler};
pub use text::TextHandler;

#[cfg(feature = "archives")]
pub use archive::ArchiveHandler;

#[cfg(feature = "office")]
pub use docx::DocxHandler;

#[cfg(feature = "html")]
pub use html::HtmlHandler;

#[cfg(feature = "office")]
pub use markdown::MarkdownHandler;

#[cfg(feature = "pdf")]
pub use pdf::PdfHandler;

#[cfg(feature = "xml")]
pub use xml::XmlHandler;

fn factory<H, F>(build: F) -> HandlerFactory
where
    H: Handler + 'static,
    F: Fn() -> H + Send + Sync + 'static,
{
    Arc::new(move || -> Result<Arc<dyn Handler>> { Ok(Arc::new(build()) as Arc<dyn Handler>) })
}

#[allow(dead_code)]
fn missing_feature(feature: &'static str, format: &'static str) -> HandlerFactory {
    Arc::new(move || -> Result<Arc<dyn Handler>> {
        Err(TextxtractError::extraction(format!(
            "{} extraction requires the `{}` feature",
            format, feature
        )))
    })
}

#[cfg(feature = "pdf")]
fn pdf_factory() -> HandlerFactory {
    factory(pdf::PdfHandler::new)
}

#[cfg(not(feature = "pdf"))]
fn pdf_factory() -> HandlerFactory {
    missing_feature("pdf", "PDF")
}

#[cfg(feature = "office")]
fn docx_factory() -> HandlerFactory {
    factory(docx::DocxHandler::new)
}

#[cfg(not(feature = "office"))]
fn docx_factory() -> HandlerFactory {
    missing_feature("office", "DOCX")
}

#[cfg(feature = "office")]
fn markdown_factory() -> HandlerFactory {
    factory(markdown::MarkdownHandler::new)
}

#[cfg(not(feature = "office"))]
fn markdown_factory() -> HandlerFactory {
    missing_feature("office", "Markdown")
}

#[cfg(feature = "html")]
fn html_factory() -> HandlerFactory {
    factory(html::HtmlHandler::new)
}

#[cfg(not(feature = "html"))]
fn html_factory() -> HandlerFactory {
    missing_feature("html", "HTML")
}

#[cfg(feature = "xml")]
fn xml_factory() -> HandlerFactory {
    factory(xml::XmlHandler::new)
}

#[cfg(not(feature = "xml"))]
fn xml_factory() -> HandlerFactory {
    missing_feature("xml", "XML")
}

#[cfg(feature = "archives")]
fn zip_factory() -> HandlerFactory {
    factory(archive::ArchiveHandler::new)
}

#[cfg(not(feature = "archives"))]
fn zip_factory() -> HandlerFactory {
    missing_feature("archives", "ZIP")
}

/// Install the built-in extension map into `registry`, replacing existing entries.
///
/// ```rust
/// use textxtract::extractors::register_default_handlers;
/// use textxtract::plugins::HandlerRegistry;
///
/// let registry = HandlerRegistry::new();
/// register_default_handlers(&registry);
/// assert!(registry.is_supported("docx"));
/// assert!(!registry.is_constructed("docx"));
/// ```
pub fn register_default_handlers(registry: &HandlerRegistry) {
    let defaults: [(&str, HandlerFactory); 14] = [
        ("txt", factory(TextHandler::new)),
        ("text", factory(TextHandler::new)),
        ("pdf", pdf_factory()),
        ("docx", docx_factory()),
        ("doc", factory(DocHandler::new)),
        ("md", markdown_factory()),
        ("markdown", markdown_factory()),
        ("rtf", factory(RtfHandler::new)),
        ("html", html_factory()),
        ("htm", html_factory()),
        ("csv", factory(CsvHandler::new)),
        ("json", factory(JsonHandler::new)),
        ("xml", xml_factory()),
        ("zip", zip_factory()),
    ];

    for (extension, factory) in defaults {
        registry.insert_factory(extension, factory);
    }

    tracing::debug!(count = registry.len(), "Registered built-in handlers");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_lazy() {
        let registry = HandlerRegistry::new();
        register_default_handlers(&registry);

        assert_eq!(registry.len(), 14);
        for ext in registry.extensions() {
            assert!(!registry.is_constructed(&ext), "{ext} constructed eagerly");
        }
    }

    #[test]
    fn test_each_builtin_reports_its_extension() {
        let registry = HandlerRegistry::new();
        register_default_handlers(&registry);

        for ext in ["txt", "doc", "rtf", "csv", "json"] {
            let handler = registry.resolve(ext).unwrap();
            assert!(handler.supported_extensions().contains(&ext), "{ext}");
        }
    }

    #[cfg(all(feature = "pdf", feature = "office", feature = "html", feature = "xml", feature = "archives"))]
    #[test]
    fn test_feature_gated_builtins_resolve() {
        let registry = HandlerRegistry::new();
        register_default_handlers(&registry);

        for ext in ["pdf", "docx", "md", "markdown", "html", "htm", "xml", "zip"] {
            let handler = registry.resolve(ext).unwrap();
            assert!(handler.supported_extensions().contains(&ext), "{ext}");
        }
    }
}

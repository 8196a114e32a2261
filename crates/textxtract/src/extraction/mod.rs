//! Format decoding helpers used by the built-in handlers.

pub mod structured;
pub mod text;

#[cfg(feature = "archives")]
pub mod archive;

#[cfg(feature = "office")]
pub mod docx;

#[cfg(feature = "html")]
pub mod html;

#[cfg(any(feature = "office", feature = "html"))]
pub mod markdown;

#[cfg(feature = "xml")]
pub mod xml;

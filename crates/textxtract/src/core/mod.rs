//! Extraction orchestration.
//!
//! - [`config`] - layered configuration and file loading
//! - [`validation`] - input checks and temporary files for byte input
//! - [`extractor`] / [`async_extractor`] - the blocking and async front doors
//! - [`pool`] - bounded worker pool used by the async extractor

pub mod async_extractor;
pub mod config;
pub mod context;
pub mod extractor;
pub mod lifecycle;
pub mod pool;
pub mod validation;

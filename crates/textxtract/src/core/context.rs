//! Per-request state handed to handlers.
use crate::core::config::ExtractionConfig;
use crate::plugins::registry::HandlerRegistry;
use crate::{Result, TextxtractError};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Effective configuration plus the registry that resolved the handler.
///
/// Archive handlers use [`ExtractionContext::nested`] to dispatch entries back
/// through the same registry; nested contexts share one cumulative byte budget.
#[derive(Debug, Clone)]
pub struct ExtractionContext {
    config: Arc<ExtractionConfig>,
    registry: Arc<HandlerRegistry>,
    depth: usize,
    archive_bytes: Arc<AtomicU64>,
}

impl ExtractionContext {
    pub fn new(config: Arc<ExtractionConfig>, registry: Arc<HandlerRegistry>) -> Self {
        Self {
            config,
            registry,
            depth: 0,
            archive_bytes: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Archive nesting depth; 0 for the top-level file.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Context for an entry one archive level deeper.
    pub fn nested(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            registry: Arc::clone(&self.registry),
            depth: self.depth + 1,
            archive_bytes: Arc::clone(&self.archive_bytes),
        }
    }

    /// Uncompressed archive bytes admitted so far in this request.
    pub fn archive_bytes_used(&self) -> u64 {
        self.archive_bytes.load(Ordering::Acquire)
    }

    /// Bytes still available under the cumulative archive ceiling.
    pub fn archive_bytes_remaining(&self) -> u64 {
        self.config
            .effective_archive_ceiling()
            .saturating_sub(self.archive_bytes_used())
    }

    /// Charge `bytes` against the cumulative archive ceiling.
    ///
    /// # Errors
    ///
    /// `InvalidFile` when the ceiling would be exceeded; nothing is charged then.
    pub fn reserve_archive_bytes(&self, bytes: u64) -> Result<()> {
        let ceiling = self.config.effective_archive_ceiling();
        self.archive_bytes
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                used.checked_add(bytes).filter(|total| *total <= ceiling)
            })
            .map(|_| ())
            .map_err(|used| {
                TextxtractError::invalid_file(format!(
                    "Archive exceeds the cumulative uncompressed size limit of {} bytes ({} already extracted, {} more requested)",
                    ceiling, used, bytes
                ))
            })
    }
}

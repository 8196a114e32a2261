//! Request state machine shared by both orchestrators.
//!
//! `Idle -> Validating -> Resolving -> Extracting -> Cleaning -> Done`, with
//! `Failed` reachable from every non-terminal state.
use crate::core::config::LogLevel;
use crate::TextxtractError;
use std::fmt;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtractionState {
    Idle,
    Validating,
    Resolving,
    Extracting,
    Cleaning,
    Done,
    Failed,
}

impl ExtractionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ExtractionState::Done | ExtractionState::Failed)
    }

    pub fn can_transition(self, next: ExtractionState) -> bool {
        use ExtractionState::*;

        match (self, next) {
            (Done | Failed, _) => false,
            (_, Failed) => true,
            (Idle, Validating)
            | (Validating, Resolving)
            | (Resolving, Extracting)
            | (Extracting, Cleaning)
            | (Cleaning, Done) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ExtractionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExtractionState::Idle => "idle",
            ExtractionState::Validating => "validating",
            ExtractionState::Resolving => "resolving",
            ExtractionState::Extracting => "extracting",
            ExtractionState::Cleaning => "cleaning",
            ExtractionState::Done => "done",
            ExtractionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Tracks one request through [`ExtractionState`] and logs transitions at trace level.
#[derive(Debug)]
pub struct Lifecycle {
    state: ExtractionState,
    started: Instant,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            state: ExtractionState::Idle,
            started: Instant::now(),
        }
    }

    pub fn state(&self) -> ExtractionState {
        self.state
    }

    /// Move to `next`. Illegal transitions are ignored and logged.
    ///
    /// A worker may still report progress after its caller timed out and
    /// finished the request; such late transitions are dropped quietly.
    pub fn advance(&mut self, next: ExtractionState) {
        if self.state.is_terminal() {
            tracing::trace!(state = %self.state, ignored = %next, "Late transition after request finished");
            return;
        }

        if self.state.can_transition(next) {
            tracing::trace!(from = %self.state, to = %next, "Extraction state transition");
            self.state = next;
        } else {
            tracing::warn!(from = %self.state, to = %next, "Ignoring illegal extraction state transition");
        }
    }

    /// Finish as `Done` or `Failed` and emit the outcome at `level`.
    pub fn finish<T>(&mut self, result: &Result<T, TextxtractError>, level: LogLevel) {
        let elapsed_ms = self.started.elapsed().as_millis() as u64;
        match result {
            Ok(_) => {
                if self.state != ExtractionState::Cleaning {
                    self.advance(ExtractionState::Cleaning);
                }
                self.advance(ExtractionState::Done);
                log_at!(level, elapsed_ms, "Extraction completed");
            }
            Err(e) => {
                let failed_in = self.state;
                self.advance(ExtractionState::Failed);
                log_at!(level, elapsed_ms, error = %e, state = %failed_in, "Extraction failed");
            }
        }
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

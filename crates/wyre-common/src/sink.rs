//! Structured error accumulation.
//!
//! Resolution does not fail fast across independent sub-resolutions: when
//! a recipe's dependencies fan out, every sibling is attempted and each
//! failure lands here, so a single top-level call reports everything found
//! in one pass. Collection is separated from rendering; presentation
//! belongs to the consuming layer.

use crate::errors::{ResolutionError, ResolutionErrors};

/// Accumulates [`ResolutionError`]s during one resolution call.
#[derive(Default, Debug)]
pub struct ErrorSink {
    errors: Vec<ResolutionError>,
}

impl ErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error. Returns the error's index for callers that want
    /// to refer back to it.
    pub fn push(&mut self, error: ResolutionError) -> usize {
        self.errors.push(error);
        self.errors.len() - 1
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// The collected errors.
    pub fn errors(&self) -> &[ResolutionError] {
        &self.errors
    }

    /// The most recently recorded error.
    pub fn last(&self) -> Option<&ResolutionError> {
        self.errors.last()
    }

    /// Take the collected errors, leaving the sink empty.
    pub fn take(&mut self) -> Vec<ResolutionError> {
        std::mem::take(&mut self.errors)
    }

    /// Drain into an aggregate, or `Ok` if nothing was recorded.
    pub fn finish(mut self) -> Result<(), ResolutionErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ResolutionErrors::new(self.take()))
        }
    }
}

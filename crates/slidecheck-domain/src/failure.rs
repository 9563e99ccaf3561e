//! Non-fatal outcomes surfaced alongside findings

use crate::batch::BatchId;
use crate::finding::DetectorKind;
use std::fmt;

/// A (batch, detector) pair that exhausted its retries
///
/// The run carries on without it; the report lists it so the reader knows
/// which part of the deck was not covered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialFailure {
    /// Detector that was skipped
    pub kind: DetectorKind,
    /// Batch that was skipped
    pub batch: BatchId,
    /// Last error seen
    pub reason: String,
    /// Attempts made before giving up
    pub attempts: u32,
}

impl fmt::Display for PartialFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} detector skipped for batch {} after {} attempt(s): {}",
            self.kind, self.batch, self.attempts, self.reason
        )
    }
}

/// A non-fatal problem recorded during a run
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Warning {
    /// Slide the warning is about, if any
    pub slide: Option<usize>,
    /// What went wrong
    pub message: String,
}

impl Warning {
    /// Warning tied to a slide
    pub fn for_slide(slide: usize, message: impl Into<String>) -> Self {
        Self {
            slide: Some(slide),
            message: message.into(),
        }
    }

    /// Warning about the run as a whole
    pub fn general(message: impl Into<String>) -> Self {
        Self {
            slide: None,
            message: message.into(),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.slide {
            Some(slide) => write!(f, "slide {}: {}", slide, self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl From<&PartialFailure> for Warning {
    fn from(failure: &PartialFailure) -> Self {
        Warning::general(failure.to_string())
    }
}

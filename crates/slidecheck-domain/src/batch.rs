//! Batches - the unit of inference-service invocation

use crate::slide::SlideRecord;
use std::fmt;

/// Sequential identifier of a batch within one run (0-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BatchId(pub usize);

impl BatchId {
    /// Get the raw batch number
    pub fn value(&self) -> usize {
        self.0
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An ordered, non-overlapping group of slides
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    /// Batch identifier
    pub id: BatchId,

    /// Slides in document order
    pub slides: Vec<SlideRecord>,
}

impl Batch {
    /// Create a batch
    pub fn new(id: BatchId, slides: Vec<SlideRecord>) -> Self {
        Self { id, slides }
    }

    /// Number of slides in the batch
    pub fn len(&self) -> usize {
        self.slides.len()
    }

    /// True when the batch holds no slides
    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }

    /// Indices of the slides in this batch, in order
    pub fn slide_indices(&self) -> Vec<usize> {
        self.slides.iter().map(|s| s.index).collect()
    }

    /// Whether the slide with the given index belongs to this batch
    pub fn contains_slide(&self, index: usize) -> bool {
        self.slides.iter().any(|s| s.index == index)
    }

    /// Human-readable slide range, e.g. "1-10" or "4"
    pub fn slide_range(&self) -> String {
        match (self.slides.first(), self.slides.last()) {
            (Some(first), Some(last)) if first.index == last.index => first.index.to_string(),
            (Some(first), Some(last)) => format!("{}-{}", first.index, last.index),
            _ => String::from("-"),
        }
    }
}

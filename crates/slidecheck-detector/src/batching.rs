//! Groups slides into bounded batches

use crate::error::DetectorError;
use slidecheck_domain::{Batch, BatchId, SlideRecord};

/// Splits a deck into consecutive batches of at most `max_batch_size` slides
#[derive(Debug, Clone, Copy)]
pub struct Batcher {
    max_batch_size: usize,
}

impl Batcher {
    /// Create a new batcher
    pub fn new(max_batch_size: usize) -> Result<Self, DetectorError> {
        if max_batch_size == 0 {
            return Err(DetectorError::Config(
                "max_batch_size must be greater than 0".to_string(),
            ));
        }
        Ok(Self { max_batch_size })
    }

    /// Maximum slides per batch
    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    /// Partition `slides` in order; batch ids count up from 0
    pub fn batch(&self, slides: &[SlideRecord]) -> Vec<Batch> {
        slides
            .chunks(self.max_batch_size)
            .enumerate()
            .map(|(id, chunk)| Batch::new(BatchId(id), chunk.to_vec()))
            .collect()
    }
}

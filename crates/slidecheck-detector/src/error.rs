//! Error types for detection

use slidecheck_domain::{BatchId, DetectorKind};
use slidecheck_llm::LlmError;
use thiserror::Error;

/// Errors that can occur during detection
#[derive(Error, Debug)]
pub enum DetectorError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Non-retryable service failure; the run is aborted
    #[error("{kind} detector failed on batch {batch}: {source}")]
    FatalService {
        /// Detector that hit the failure
        kind: DetectorKind,
        /// Batch being analysed
        batch: BatchId,
        /// Underlying service error
        #[source]
        source: LlmError,
    },

    /// Service response is not a valid findings array
    #[error("Invalid detector response: {0}")]
    InvalidResponse(String),

    /// JSON parsing error
    #[error("JSON parse error: {0}")]
    JsonParse(String),
}

impl From<serde_json::Error> for DetectorError {
    fn from(e: serde_json::Error) -> Self {
        DetectorError::JsonParse(e.to_string())
    }
}

impl From<DetectorError> for LlmError {
    /// Response problems are reported to the retry loop as unusable responses
    fn from(e: DetectorError) -> Self {
        match e {
            DetectorError::FatalService { source, .. } => source,
            other => LlmError::InvalidResponse(other.to_string()),
        }
    }
}

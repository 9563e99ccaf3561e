//! SlideCheck LLM Provider Layer
//!
//! Pluggable inference and OCR providers behind two async traits.
//!
//! # Architecture
//!
//! The detector dispatcher and the content extractor only ever see
//! [`InferenceService`] and [`OcrService`]. A provider is built once, wrapped
//! in an `Arc` and shared by every concurrent request; providers hold no
//! per-request state.
//!
//! # Providers
//!
//! - `MockProvider` / `MockOcr`: deterministic doubles for testing
//! - `GeminiProvider`: Google Gemini `generateContent` REST API
//!
//! # Errors
//!
//! Every provider reports failures as [`LlmError`]. The dispatcher decides
//! whether to retry with [`LlmError::is_transient`].
//!
//! # Examples
//!
//! ```
//! use slidecheck_llm::{InferenceService, MockProvider};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let provider = MockProvider::new("[]");
//! let result = provider.generate("any prompt").await.unwrap();
//! assert_eq!(result, "[]");
//! # }
//! ```

#![warn(missing_docs)]

pub mod gemini;
pub mod mock;
pub mod provider;

use thiserror::Error;

pub use gemini::GeminiProvider;
pub use mock::{MockOcr, MockProvider};
pub use provider::{ImageData, InferenceService, OcrService};

/// Errors that can occur during LLM operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Request did not complete within the configured timeout
    #[error("Request timed out after {0}s")]
    Timeout(u64),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Service-side failure (HTTP 5xx)
    #[error("Server error (HTTP {status}): {message}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Response body or reason
        message: String,
    },

    /// Response could not be used (empty, blocked, or not the expected schema)
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Credentials rejected
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Request rejected as malformed
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Model not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// API key environment variable is unset or empty
    #[error("API key not found in environment variable {0}")]
    MissingApiKey(String),

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

impl LlmError {
    /// Whether retrying the same request could succeed
    ///
    /// Timeouts, rate limits, 5xx responses, connection failures and
    /// unusable responses are transient. Credential, request and model
    /// errors are not: no other request would succeed either.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LlmError::Communication(_)
                | LlmError::Timeout(_)
                | LlmError::RateLimitExceeded
                | LlmError::Server { .. }
                | LlmError::InvalidResponse(_)
        )
    }
}

//! Error types for the CLI application.

use slidecheck_detector::DetectorError;
use slidecheck_extractor::ExtractionError;
use slidecheck_llm::LlmError;
use thiserror::Error;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Presentation could not be read
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// Detection aborted
    #[error(transparent)]
    Detection(DetectorError),

    /// Inference service could not be set up
    #[error("Service error: {0}")]
    Service(LlmError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Ctrl-C before the analysis finished
    #[error("Interrupted")]
    Interrupted,
}

impl CliError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) | CliError::Toml(_) => 2,
            CliError::Extraction(_) => 3,
            CliError::Detection(DetectorError::FatalService { .. }) | CliError::Service(_) => 4,
            CliError::Interrupted => 130,
            _ => 1,
        }
    }
}

impl From<DetectorError> for CliError {
    fn from(e: DetectorError) -> Self {
        match e {
            DetectorError::Config(msg) => CliError::Config(msg),
            other => CliError::Detection(other),
        }
    }
}

impl From<LlmError> for CliError {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::MissingApiKey(var) => CliError::Config(format!(
                "API key not found: set the {} environment variable",
                var
            )),
            other => CliError::Service(other),
        }
    }
}

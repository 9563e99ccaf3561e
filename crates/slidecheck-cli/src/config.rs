//! Configuration management for the CLI.

use crate::error::{CliError, Result};
use serde::{Deserialize, Serialize};
use slidecheck_detector::{DetectorConfig, DetectorThresholds};
use slidecheck_domain::DetectorKind;
use slidecheck_llm::gemini;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "slidecheck.toml";

/// CLI configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Inference service settings
    pub gemini: GeminiSettings,

    /// Batching settings
    pub batching: BatchingSettings,

    /// Detector selection and thresholds
    pub detectors: DetectorSettings,

    /// Severity thresholds
    pub severity: SeveritySettings,

    /// OCR settings
    pub ocr: OcrSettings,

    /// Output settings
    pub output: OutputSettings,
}

/// Gemini client settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiSettings {
    /// Model name
    pub model: String,

    /// Retries after the first attempt
    pub max_retries: u32,

    /// Environment variable holding the API key
    pub api_key_env: String,

    /// API base URL
    pub endpoint: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Maximum requests in flight
    pub max_concurrency: usize,

    /// Backoff before the first retry, in milliseconds
    pub backoff_base_ms: u64,

    /// Backoff cap, in milliseconds
    pub backoff_max_ms: u64,

    /// Minimum gap between request starts, in milliseconds
    pub request_delay_ms: u64,

    /// Wait before retrying after a rate limit, in milliseconds
    pub rate_limit_wait_ms: u64,
}

/// Batching settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchingSettings {
    /// Slides per request
    pub max_batch_size: usize,
}

/// Detector settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorSettings {
    /// Detector kinds to run
    pub enabled: Vec<String>,

    /// Findings below this confidence are not reported
    pub min_confidence: f64,

    /// Numerical detector
    pub numerical: NumericalSettings,

    /// Textual detector
    pub textual: TextualSettings,

    /// Percentage detector
    pub percentage: PercentageSettings,

    /// Timeline detector
    pub timeline: TimelineSettings,
}

/// Numerical detector settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NumericalSettings {
    /// Relative difference (percent) still treated as equal
    pub tolerance_pct: f64,
}

/// Textual detector settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextualSettings {
    /// Minimum similarity for two claims to be compared
    pub similarity_threshold: f64,
}

/// Percentage detector settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PercentageSettings {
    /// Allowed deviation of a breakdown from 100%, in percentage points
    pub total_tolerance_pp: f64,
}

/// Timeline detector settings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineSettings {
    /// Overlap in days tolerated between periods
    pub overlap_tolerance_days: u32,
}

/// Severity thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeveritySettings {
    /// Minimum confidence for high severity
    pub high: f64,

    /// Minimum confidence for medium severity
    pub medium: f64,
}

/// OCR settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrSettings {
    /// OCR images embedded in the slides
    pub enabled: bool,
}

/// Output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Default output format
    pub format: OutputFormat,

    /// Enable colored output
    pub color: bool,
}

/// Named preset applied on top of the loaded configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Profile {
    /// Keep the configuration as loaded
    Standard,
    /// One paced request at a time, for free-tier quotas
    Free,
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Coloured table
    Rich,
    /// Plain text
    Simple,
    /// JSON report
    Json,
}

impl Config {
    /// Path of the per-user configuration file.
    pub fn user_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".slidecheck").join("config.toml"))
    }

    /// Load configuration.
    ///
    /// An explicit path must exist. Otherwise `./slidecheck.toml` and then
    /// `~/.slidecheck/config.toml` are tried, falling back to defaults.
    /// Returns the configuration and the file it came from, if any.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        if let Some(path) = explicit {
            if !path.is_file() {
                return Err(CliError::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            return Ok((Self::load_from(path)?, Some(path.to_path_buf())));
        }

        let candidates =
            std::iter::once(PathBuf::from(LOCAL_CONFIG_FILE)).chain(Self::user_path());
        for path in candidates {
            if path.is_file() {
                return Ok((Self::load_from(&path)?, Some(path)));
            }
            debug!(path = %path.display(), "No config file");
        }

        Ok((Self::default(), None))
    }

    /// Load and validate configuration from a file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config = Self::from_toml(&contents)
            .map_err(|e| CliError::Config(format!("{}: {}", path.display(), e)))?;
        Ok(config)
    }

    /// Parse and validate configuration.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| CliError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<()> {
        if self.gemini.model.trim().is_empty() {
            return Err(CliError::Config("gemini.model must not be empty".into()));
        }
        if self.gemini.api_key_env.trim().is_empty() {
            return Err(CliError::Config("gemini.api_key_env must not be empty".into()));
        }
        self.detector_config().validate()?;
        Ok(())
    }

    /// Apply a preset's batching, pacing and retry settings.
    pub fn with_profile(mut self, profile: Profile) -> Self {
        match profile {
            Profile::Standard => {}
            Profile::Free => {
                let preset = DetectorConfig::free_tier();
                debug!("Applying free-tier profile");
                self.batching.max_batch_size = preset.max_batch_size;
                self.gemini.max_concurrency = preset.max_concurrency;
                self.gemini.max_retries = preset.max_retries;
                self.gemini.timeout_secs = preset.request_timeout_secs;
                self.gemini.backoff_base_ms = preset.backoff_base_ms;
                self.gemini.backoff_max_ms = preset.backoff_max_ms;
                self.gemini.request_delay_ms = preset.request_delay_ms;
                self.gemini.rate_limit_wait_ms = preset.rate_limit_wait_ms;
            }
        }
        self
    }

    /// Settings for the detection pipeline.
    pub fn detector_config(&self) -> DetectorConfig {
        DetectorConfig {
            max_batch_size: self.batching.max_batch_size,
            max_concurrency: self.gemini.max_concurrency,
            max_retries: self.gemini.max_retries,
            request_timeout_secs: self.gemini.timeout_secs,
            backoff_base_ms: self.gemini.backoff_base_ms,
            backoff_max_ms: self.gemini.backoff_max_ms,
            request_delay_ms: self.gemini.request_delay_ms,
            rate_limit_wait_ms: self.gemini.rate_limit_wait_ms,
            enabled: self.detectors.enabled.clone(),
            thresholds: DetectorThresholds {
                tolerance_pct: self.detectors.numerical.tolerance_pct,
                similarity_threshold: self.detectors.textual.similarity_threshold,
                total_tolerance_pp: self.detectors.percentage.total_tolerance_pp,
                overlap_tolerance_days: self.detectors.timeline.overlap_tolerance_days,
                min_confidence: self.detectors.min_confidence,
            },
            severity_high: self.severity.high,
            severity_medium: self.severity.medium,
        }
    }
}

impl Default for GeminiSettings {
    fn default() -> Self {
        let detector = DetectorConfig::default();
        Self {
            model: gemini::DEFAULT_MODEL.to_string(),
            max_retries: detector.max_retries,
            api_key_env: gemini::DEFAULT_API_KEY_ENV.to_string(),
            endpoint: gemini::DEFAULT_ENDPOINT.to_string(),
            timeout_secs: gemini::DEFAULT_TIMEOUT_SECS,
            max_concurrency: detector.max_concurrency,
            backoff_base_ms: detector.backoff_base_ms,
            backoff_max_ms: detector.backoff_max_ms,
            request_delay_ms: detector.request_delay_ms,
            rate_limit_wait_ms: detector.rate_limit_wait_ms,
        }
    }
}

impl Default for BatchingSettings {
    fn default() -> Self {
        Self {
            max_batch_size: DetectorConfig::default().max_batch_size,
        }
    }
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            enabled: DetectorKind::ALL.iter().map(|k| k.as_str().to_string()).collect(),
            min_confidence: DetectorThresholds::default().min_confidence,
            numerical: NumericalSettings::default(),
            textual: TextualSettings::default(),
            percentage: PercentageSettings::default(),
            timeline: TimelineSettings::default(),
        }
    }
}

impl Default for NumericalSettings {
    fn default() -> Self {
        Self {
            tolerance_pct: DetectorThresholds::default().tolerance_pct,
        }
    }
}

impl Default for TextualSettings {
    fn default() -> Self {
        Self {
            similarity_threshold: DetectorThresholds::default().similarity_threshold,
        }
    }
}

impl Default for PercentageSettings {
    fn default() -> Self {
        Self {
            total_tolerance_pp: DetectorThresholds::default().total_tolerance_pp,
        }
    }
}

impl Default for SeveritySettings {
    fn default() -> Self {
        Self {
            high: 0.8,
            medium: 0.6,
        }
    }
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            format: OutputFormat::Rich,
            color: true,
        }
    }
}

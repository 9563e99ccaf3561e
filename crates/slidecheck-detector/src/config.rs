//! Configuration for batching, dispatch and the detectors

use crate::error::DetectorError;
use serde::{Deserialize, Serialize};
use slidecheck_domain::{DetectorKind, ParseKindError, SeverityThresholds};
use std::time::Duration;

/// Per-detector tuning embedded in the prompts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorThresholds {
    /// Relative difference (percent) under which two values count as equal
    pub tolerance_pct: f64,
    /// How alike two statements must be before a contradiction is reported
    pub similarity_threshold: f64,
    /// Allowed deviation (percentage points) of a breakdown from 100%
    pub total_tolerance_pp: f64,
    /// Date overlap (days) tolerated before a timeline mismatch is reported
    pub overlap_tolerance_days: u32,
    /// Findings less confident than this are left out of the report
    pub min_confidence: f64,
}

impl Default for DetectorThresholds {
    fn default() -> Self {
        Self {
            tolerance_pct: 1.0,
            similarity_threshold: 0.75,
            total_tolerance_pp: 1.0,
            overlap_tolerance_days: 0,
            min_confidence: 0.0,
        }
    }
}

/// Configuration for a detection run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Slides per batch
    pub max_batch_size: usize,

    /// Maximum requests in flight at once
    pub max_concurrency: usize,

    /// Retries after the first attempt of a (batch, detector) pair
    pub max_retries: u32,

    /// Timeout for a single request (seconds)
    pub request_timeout_secs: u64,

    /// Backoff before the first retry (milliseconds); doubles per retry
    pub backoff_base_ms: u64,

    /// Upper bound on a single backoff (milliseconds)
    pub backoff_max_ms: u64,

    /// Minimum gap between the starts of two requests (milliseconds)
    pub request_delay_ms: u64,

    /// Wait before retrying a rate-limited request (milliseconds)
    pub rate_limit_wait_ms: u64,

    /// Detector kinds to run, by name
    pub enabled: Vec<String>,

    /// Prompt thresholds
    pub thresholds: DetectorThresholds,

    /// Minimum confidence for high severity
    pub severity_high: f64,

    /// Minimum confidence for medium severity
    pub severity_medium: f64,
}

impl DetectorConfig {
    /// Per-request timeout as a Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Minimum gap between request starts as a Duration
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    /// Severity thresholds
    pub fn severity(&self) -> SeverityThresholds {
        SeverityThresholds::new(self.severity_high, self.severity_medium)
    }

    /// Enabled detector kinds, deduplicated, in canonical order
    pub fn enabled_kinds(&self) -> Result<Vec<DetectorKind>, DetectorError> {
        let mut kinds = Vec::new();
        for name in &self.enabled {
            let kind: DetectorKind = name
                .parse()
                .map_err(|e: ParseKindError| DetectorError::Config(e.to_string()))?;
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        kinds.sort();
        Ok(kinds)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), DetectorError> {
        let fail = |msg: String| Err(DetectorError::Config(msg));

        if self.max_batch_size == 0 {
            return fail("max_batch_size must be greater than 0".to_string());
        }
        if self.max_concurrency == 0 {
            return fail("max_concurrency must be greater than 0".to_string());
        }
        if self.request_timeout_secs == 0 {
            return fail("request_timeout_secs must be greater than 0".to_string());
        }
        if self.backoff_base_ms > self.backoff_max_ms {
            return fail(format!(
                "backoff_base_ms ({}) cannot exceed backoff_max_ms ({})",
                self.backoff_base_ms, self.backoff_max_ms
            ));
        }
        if self.enabled_kinds()?.is_empty() {
            return fail("at least one detector must be enabled".to_string());
        }

        let t = &self.thresholds;
        if !(t.tolerance_pct.is_finite() && t.tolerance_pct >= 0.0) {
            return fail(format!(
                "tolerance_pct must be non-negative, got {}",
                t.tolerance_pct
            ));
        }
        if !(t.total_tolerance_pp.is_finite() && t.total_tolerance_pp >= 0.0) {
            return fail(format!(
                "total_tolerance_pp must be non-negative, got {}",
                t.total_tolerance_pp
            ));
        }
        if !(0.0..=1.0).contains(&t.similarity_threshold) {
            return fail(format!(
                "similarity_threshold must be in [0, 1], got {}",
                t.similarity_threshold
            ));
        }
        if !(0.0..=1.0).contains(&t.min_confidence) {
            return fail(format!(
                "min_confidence must be in [0, 1], got {}",
                t.min_confidence
            ));
        }

        self.severity().validate().map_err(DetectorError::Config)
    }
}

impl Default for DetectorConfig {
    /// Default configuration with balanced settings
    fn default() -> Self {
        Self {
            max_batch_size: 10,
            max_concurrency: 4,
            max_retries: 2,
            request_timeout_secs: 60,
            backoff_base_ms: 1_000,
            backoff_max_ms: 30_000,
            request_delay_ms: 0,
            rate_limit_wait_ms: 0,
            enabled: DetectorKind::ALL.iter().map(|k| k.as_str().to_string()).collect(),
            thresholds: DetectorThresholds::default(),
            severity_high: 0.8,
            severity_medium: 0.6,
        }
    }
}

impl DetectorConfig {
    /// Free-tier preset: one request every 8s, bigger batches, a full
    /// minute of waiting after a rate limit
    pub fn free_tier() -> Self {
        Self {
            max_batch_size: 15,
            max_concurrency: 1,
            max_retries: 2,
            request_timeout_secs: 90,
            backoff_base_ms: 8_000,
            backoff_max_ms: 60_000,
            request_delay_ms: 8_000,
            rate_limit_wait_ms: 60_000,
            ..Self::default()
        }
    }
}

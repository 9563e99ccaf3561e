//! Severity buckets derived from finding confidence

use std::fmt;

/// How urgently a finding should be looked at
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Confidence below the medium threshold
    Low,
    /// Confidence at or above the medium threshold
    Medium,
    /// Confidence at or above the high threshold
    High,
}

impl Severity {
    /// Lowercase name used in structured output
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Confidence cut-offs for the severity buckets
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeverityThresholds {
    /// Minimum confidence for [`Severity::High`]
    pub high: f64,
    /// Minimum confidence for [`Severity::Medium`]
    pub medium: f64,
}

impl SeverityThresholds {
    /// Create thresholds without validating them
    pub fn new(high: f64, medium: f64) -> Self {
        Self { high, medium }
    }

    /// Classify a confidence score
    ///
    /// # Examples
    ///
    /// ```
    /// use slidecheck_domain::{Severity, SeverityThresholds};
    ///
    /// let thresholds = SeverityThresholds::default();
    /// assert_eq!(thresholds.classify(0.95), Severity::High);
    /// assert_eq!(thresholds.classify(0.65), Severity::Medium);
    /// assert_eq!(thresholds.classify(0.2), Severity::Low);
    /// ```
    pub fn classify(&self, confidence: f64) -> Severity {
        if confidence >= self.high {
            Severity::High
        } else if confidence >= self.medium {
            Severity::Medium
        } else {
            Severity::Low
        }
    }

    /// Check that both thresholds are in [0, 1] and ordered
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [("high", self.high), ("medium", self.medium)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("severity.{} must be in [0, 1], got {}", name, value));
            }
        }
        if self.medium > self.high {
            return Err(format!(
                "severity.medium ({}) cannot exceed severity.high ({})",
                self.medium, self.high
            ));
        }
        Ok(())
    }
}

impl Default for SeverityThresholds {
    fn default() -> Self {
        Self {
            high: 0.8,
            medium: 0.6,
        }
    }
}

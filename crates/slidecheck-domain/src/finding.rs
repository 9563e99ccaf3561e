//! Findings - detected inconsistencies between or within slides

use crate::severity::{Severity, SeverityThresholds};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Category of inconsistency a detector looks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DetectorKind {
    /// Conflicting values for the same metric
    Numerical,
    /// Percentages that should add up to a whole but don't
    Percentage,
    /// Statements that contradict each other
    Textual,
    /// Dates or sequences that cannot all be true
    Timeline,
}

impl DetectorKind {
    /// Every detector kind, in reporting order
    pub const ALL: [DetectorKind; 4] = [
        DetectorKind::Numerical,
        DetectorKind::Percentage,
        DetectorKind::Textual,
        DetectorKind::Timeline,
    ];

    /// Lowercase name used in configuration and structured output
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectorKind::Numerical => "numerical",
            DetectorKind::Percentage => "percentage",
            DetectorKind::Textual => "textual",
            DetectorKind::Timeline => "timeline",
        }
    }

    /// Display label for human-oriented output
    pub fn label(&self) -> &'static str {
        match self {
            DetectorKind::Numerical => "Numerical conflict",
            DetectorKind::Percentage => "Percentage error",
            DetectorKind::Textual => "Textual contradiction",
            DetectorKind::Timeline => "Timeline mismatch",
        }
    }
}

impl fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a detector name is not recognized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseKindError(pub String);

impl fmt::Display for ParseKindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown detector '{}' (expected numerical, percentage, textual or timeline)",
            self.0
        )
    }
}

impl std::error::Error for ParseKindError {}

impl FromStr for DetectorKind {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "numerical" => Ok(DetectorKind::Numerical),
            "percentage" => Ok(DetectorKind::Percentage),
            "textual" => Ok(DetectorKind::Textual),
            "timeline" => Ok(DetectorKind::Timeline),
            other => Err(ParseKindError(other.to_string())),
        }
    }
}

/// Why a finding could not be constructed
#[derive(Debug, Clone, PartialEq)]
pub enum FindingError {
    /// The slide set was empty
    NoSlides,
    /// Slide indices are 1-based; 0 was given
    ZeroSlideIndex,
    /// Confidence was NaN or outside [0, 1]
    ConfidenceOutOfRange(f64),
    /// Description was blank
    EmptyDescription,
}

impl fmt::Display for FindingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FindingError::NoSlides => f.write_str("finding must reference at least one slide"),
            FindingError::ZeroSlideIndex => f.write_str("slide indices are 1-based"),
            FindingError::ConfidenceOutOfRange(c) => {
                write!(f, "confidence {} out of range [0.0, 1.0]", c)
            }
            FindingError::EmptyDescription => f.write_str("finding description is empty"),
        }
    }
}

impl std::error::Error for FindingError {}

/// Identity of a finding for deduplication
///
/// Two findings are duplicates when kind, slide set and normalized
/// description all match.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FindingKey {
    /// Detector kind
    pub kind: DetectorKind,
    /// Sorted slide indices
    pub slides: Vec<usize>,
    /// Lowercased, whitespace-collapsed description
    pub description: String,
}

/// A single detected inconsistency
///
/// Fields are private so the invariants checked by [`Finding::new`] hold for
/// the lifetime of the value.
#[derive(Debug, Clone, PartialEq)]
pub struct Finding {
    kind: DetectorKind,
    slides: BTreeSet<usize>,
    description: String,
    details: Option<String>,
    confidence: f64,
    severity: Severity,
}

impl Finding {
    /// Create a finding, deriving its severity from `thresholds`
    ///
    /// # Errors
    ///
    /// Fails when the slide set is empty or contains 0, when the confidence
    /// is not a number in [0, 1], or when the description is blank.
    ///
    /// # Examples
    ///
    /// ```
    /// use slidecheck_domain::{DetectorKind, Finding, Severity, SeverityThresholds};
    ///
    /// let finding = Finding::new(
    ///     DetectorKind::Numerical,
    ///     [7, 2],
    ///     "Conflicting revenue figures",
    ///     0.9,
    ///     &SeverityThresholds::default(),
    /// ).unwrap();
    ///
    /// assert_eq!(finding.slide_list(), vec![2, 7]);
    /// assert_eq!(finding.severity(), Severity::High);
    /// ```
    pub fn new(
        kind: DetectorKind,
        slides: impl IntoIterator<Item = usize>,
        description: impl Into<String>,
        confidence: f64,
        thresholds: &SeverityThresholds,
    ) -> Result<Self, FindingError> {
        let slides: BTreeSet<usize> = slides.into_iter().collect();
        if slides.is_empty() {
            return Err(FindingError::NoSlides);
        }
        if slides.contains(&0) {
            return Err(FindingError::ZeroSlideIndex);
        }
        if !confidence.is_finite() || !(0.0..=1.0).contains(&confidence) {
            return Err(FindingError::ConfidenceOutOfRange(confidence));
        }
        let description = description.into().trim().to_string();
        if description.is_empty() {
            return Err(FindingError::EmptyDescription);
        }

        Ok(Self {
            kind,
            slides,
            description,
            details: None,
            confidence,
            severity: thresholds.classify(confidence),
        })
    }

    /// Attach explanatory details; blank details are dropped
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        let details = details.into().trim().to_string();
        self.details = if details.is_empty() { None } else { Some(details) };
        self
    }

    /// Detector kind
    pub fn kind(&self) -> DetectorKind {
        self.kind
    }

    /// Slide indices involved, sorted
    pub fn slides(&self) -> &BTreeSet<usize> {
        &self.slides
    }

    /// Slide indices involved as a sorted vector
    pub fn slide_list(&self) -> Vec<usize> {
        self.slides.iter().copied().collect()
    }

    /// Lowest slide index involved
    pub fn lowest_slide(&self) -> usize {
        // Non-empty by construction
        self.slides.iter().next().copied().unwrap_or(0)
    }

    /// Description as returned by the detector
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Optional longer explanation
    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    /// Confidence in [0, 1]
    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Severity bucket
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Description lowercased with runs of whitespace collapsed to one space
    pub fn normalized_description(&self) -> String {
        normalize_description(&self.description)
    }

    /// Deduplication key
    pub fn key(&self) -> FindingKey {
        FindingKey {
            kind: self.kind,
            slides: self.slide_list(),
            description: self.normalized_description(),
        }
    }
}

/// Lowercase a description and collapse its whitespace
pub fn normalize_description(description: &str) -> String {
    description
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thresholds() -> SeverityThresholds {
        SeverityThresholds::default()
    }

    #[test]
    fn test_kind_round_trip_names() {
        for kind in DetectorKind::ALL {
            assert_eq!(kind.as_str().parse::<DetectorKind>().unwrap(), kind);
        }
        assert_eq!(" Timeline ".parse::<DetectorKind>().unwrap(), DetectorKind::Timeline);
        assert!("semantic".parse::<DetectorKind>().is_err());
    }

    #[test]
    fn test_slides_are_sorted_and_deduplicated() {
        let finding = Finding::new(
            DetectorKind::Textual,
            [5, 2, 5],
            "x",
            0.5,
            &thresholds(),
        )
        .unwrap();
        assert_eq!(finding.slide_list(), vec![2, 5]);
        assert_eq!(finding.lowest_slide(), 2);
    }

    #[test]
    fn test_rejects_invalid_input() {
        let t = thresholds();
        assert_eq!(
            Finding::new(DetectorKind::Numerical, Vec::<usize>::new(), "x", 0.5, &t),
            Err(FindingError::NoSlides)
        );
        assert_eq!(
            Finding::new(DetectorKind::Numerical, [0, 1], "x", 0.5, &t),
            Err(FindingError::ZeroSlideIndex)
        );
        assert!(matches!(
            Finding::new(DetectorKind::Numerical, [1], "x", 1.5, &t),
            Err(FindingError::ConfidenceOutOfRange(_))
        ));
        assert!(matches!(
            Finding::new(DetectorKind::Numerical, [1], "x", f64::NAN, &t),
            Err(FindingError::ConfidenceOutOfRange(_))
        ));
        assert_eq!(
            Finding::new(DetectorKind::Numerical, [1], "   ", 0.5, &t),
            Err(FindingError::EmptyDescription)
        );
    }

    #[test]
    fn test_normalized_description() {
        assert_eq!(
            normalize_description("  Conflicting\tRevenue \n Figures "),
            "conflicting revenue figures"
        );
    }

    #[test]
    fn test_key_ignores_case_and_spacing() {
        let t = thresholds();
        let a = Finding::new(
            DetectorKind::Numerical,
            [2, 7],
            "Revenue  mismatch",
            0.9,
            &t,
        )
        .unwrap();
        let b = Finding::new(
            DetectorKind::Numerical,
            [7, 2],
            "revenue mismatch",
            0.4,
            &t,
        )
        .unwrap();
        let c = Finding::new(
            DetectorKind::Textual,
            [2, 7],
            "revenue mismatch",
            0.4,
            &t,
        )
        .unwrap();
        assert_eq!(a.key(), b.key());
        assert_ne!(a.key(), c.key());
    }

    #[test]
    fn test_blank_details_dropped() {
        let finding = Finding::new(DetectorKind::Timeline, [1], "x", 0.5, &thresholds())
            .unwrap()
            .with_details("  ");
        assert_eq!(finding.details(), None);
    }
}

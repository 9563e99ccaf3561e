//! Merge per-batch findings into one report

use crate::dispatcher::{DetectorRun, RunOutcome};
use slidecheck_domain::{Finding, FindingKey, PartialFailure, Severity, Warning};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, warn};

/// Aggregated result of an analysis run
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Report {
    /// Deduplicated findings, most confident first
    pub findings: Vec<Finding>,
    /// Non-fatal problems, extraction warnings first
    pub warnings: Vec<Warning>,
    /// (batch, detector) pairs that produced nothing, by batch then kind
    pub partial_failures: Vec<PartialFailure>,
    /// Slides analysed
    pub slide_count: usize,
    /// Batches the slides were split into; findings never span two batches
    pub batch_count: usize,
}

impl Report {
    /// Number of findings with the given severity
    pub fn count_by_severity(&self, severity: Severity) -> usize {
        self.findings
            .iter()
            .filter(|f| f.severity() == severity)
            .count()
    }

    /// True when nothing was found and nothing went wrong
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty() && self.warnings.is_empty() && self.partial_failures.is_empty()
    }
}

/// Build the report for a run
///
/// `slides` is the full set of slide indices in the deck; findings that
/// reference anything else are dropped with a warning. Findings below
/// `min_confidence` are dropped silently.
pub fn aggregate(
    runs: Vec<DetectorRun>,
    slides: &BTreeSet<usize>,
    mut warnings: Vec<Warning>,
    min_confidence: f64,
) -> Report {
    let mut findings = Vec::new();
    let mut partial_failures = Vec::new();

    for run in runs {
        match run.outcome {
            RunOutcome::Completed {
                findings: found,
                warnings: dropped,
                ..
            } => {
                findings.extend(found);
                warnings.extend(dropped);
            }
            RunOutcome::Failed(failure) => partial_failures.push(failure),
        }
    }

    let (known, unknown): (Vec<Finding>, Vec<Finding>) = findings
        .into_iter()
        .partition(|f| f.slides().iter().all(|s| slides.contains(s)));
    for finding in unknown {
        warn!(
            kind = finding.kind().as_str(),
            slides = ?finding.slide_list(),
            "Dropping finding that references unknown slides"
        );
        warnings.push(Warning::general(format!(
            "{} finding references unknown slides {:?}; dropped: {}",
            finding.kind(),
            finding.slide_list(),
            finding.description()
        )));
    }

    let before_filter = known.len();
    let known: Vec<Finding> = known
        .into_iter()
        .filter(|f| f.confidence() >= min_confidence)
        .collect();
    if known.len() < before_filter {
        debug!(
            dropped = before_filter - known.len(),
            min_confidence,
            "Dropped low-confidence findings"
        );
    }

    partial_failures.sort_by(|a, b| (a.batch, a.kind).cmp(&(b.batch, b.kind)));
    warnings.extend(partial_failures.iter().map(Warning::from));

    let total = known.len();
    let findings = dedup_and_sort(known);
    debug!(before = total, after = findings.len(), "Deduplicated findings");

    Report {
        findings,
        warnings,
        partial_failures,
        slide_count: slides.len(),
        batch_count: 0,
    }
}

/// Collapse duplicates and order findings for reporting
///
/// Duplicates share kind, slide set and normalized description; the most
/// confident one survives. Output is ordered by confidence (descending),
/// then lowest slide, kind, normalized description and slide list.
/// Applying this to its own output changes nothing.
pub fn dedup_and_sort(findings: Vec<Finding>) -> Vec<Finding> {
    let mut best: HashMap<FindingKey, Finding> = HashMap::new();

    for finding in findings {
        let key = finding.key();
        match best.get(&key) {
            Some(existing) if preference(existing, &finding) != Ordering::Less => {}
            _ => {
                best.insert(key, finding);
            }
        }
    }

    let mut result: Vec<Finding> = best.into_values().collect();
    result.sort_by(report_order);
    result
}

/// Which of two duplicates to keep; `Less` means `b` wins
///
/// Higher confidence wins. Ties go to the shorter description, then to the
/// longer details, then to the lexicographically smaller description and
/// larger details.
fn preference(a: &Finding, b: &Finding) -> Ordering {
    a.confidence()
        .total_cmp(&b.confidence())
        .then_with(|| char_len(b.description()).cmp(&char_len(a.description())))
        .then_with(|| details_len(a).cmp(&details_len(b)))
        .then_with(|| b.description().cmp(a.description()))
        .then_with(|| a.details().cmp(&b.details()))
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn details_len(finding: &Finding) -> usize {
    finding.details().map_or(0, char_len)
}

fn report_order(a: &Finding, b: &Finding) -> Ordering {
    b.confidence()
        .total_cmp(&a.confidence())
        .then_with(|| a.lowest_slide().cmp(&b.lowest_slide()))
        .then_with(|| a.key().cmp(&b.key()))
        .then_with(|| a.description().cmp(b.description()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use slidecheck_domain::{BatchId, DetectorKind, SeverityThresholds};
    use proptest::prelude::*;

    fn finding(
        kind: DetectorKind,
        slides: &[usize],
        description: &str,
        confidence: f64,
    ) -> Finding {
        Finding::new(
            kind,
            slides.iter().copied(),
            description,
            confidence,
            &SeverityThresholds::default(),
        )
        .unwrap()
    }

    fn completed(kind: DetectorKind, batch: usize, findings: Vec<Finding>) -> DetectorRun {
        DetectorRun {
            kind,
            batch: BatchId(batch),
            outcome: RunOutcome::Completed {
                findings,
                warnings: vec![],
                attempts: 1,
            },
        }
    }

    #[test]
    fn test_duplicates_keep_highest_confidence() {
        let findings = vec![
            finding(DetectorKind::Numerical, &[2, 7], "Revenue differs", 0.7),
            finding(DetectorKind::Numerical, &[7, 2], "  revenue   DIFFERS ", 0.9),
            finding(DetectorKind::Numerical, &[2, 7], "Revenue differs", 0.8),
        ];

        let result = dedup_and_sort(findings);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].confidence(), 0.9);
    }

    #[test]
    fn test_equal_confidence_prefers_short_description_then_long_details() {
        let findings = vec![
            finding(DetectorKind::Numerical, &[2, 7], "REVENUE   differs", 0.8),
            finding(DetectorKind::Numerical, &[2, 7], "Revenue differs", 0.8),
        ];
        let result = dedup_and_sort(findings);
        assert_eq!(result[0].description(), "Revenue differs");

        let findings = vec![
            finding(DetectorKind::Numerical, &[2, 7], "Revenue differs", 0.8)
                .with_details("$5M vs $8M for the same quarter"),
            finding(DetectorKind::Numerical, &[2, 7], "Revenue differs", 0.8).with_details("$5M"),
            finding(DetectorKind::Numerical, &[2, 7], "Revenue differs", 0.8),
        ];
        let result = dedup_and_sort(findings);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].details(), Some("$5M vs $8M for the same quarter"));
    }

    #[test]
    fn test_different_kind_or_slides_not_merged() {
        let findings = vec![
            finding(DetectorKind::Numerical, &[2, 7], "Revenue differs", 0.7),
            finding(DetectorKind::Textual, &[2, 7], "Revenue differs", 0.7),
            finding(DetectorKind::Numerical, &[2], "Revenue differs", 0.7),
        ];
        assert_eq!(dedup_and_sort(findings).len(), 3);
    }

    #[test]
    fn test_order_by_confidence_then_slide() {
        let findings = vec![
            finding(DetectorKind::Timeline, &[9], "c", 0.5),
            finding(DetectorKind::Numerical, &[5, 6], "b", 0.9),
            finding(DetectorKind::Percentage, &[3], "a", 0.9),
        ];

        let result = dedup_and_sort(findings);
        let slides: Vec<usize> = result.iter().map(Finding::lowest_slide).collect();
        assert_eq!(slides, vec![3, 5, 9]);
    }

    #[test]
    fn test_aggregate_collects_partial_failures() {
        let failure = PartialFailure {
            kind: DetectorKind::Textual,
            batch: BatchId(1),
            reason: "Rate limit exceeded".into(),
            attempts: 3,
        };
        let runs = vec![
            completed(
                DetectorKind::Numerical,
                0,
                vec![finding(DetectorKind::Numerical, &[2, 7], "Revenue", 0.9)],
            ),
            DetectorRun {
                kind: DetectorKind::Textual,
                batch: BatchId(1),
                outcome: RunOutcome::Failed(failure.clone()),
            },
        ];
        let slides: BTreeSet<usize> = (1..=12).collect();

        let report = aggregate(runs, &slides, vec![Warning::for_slide(5, "OCR failed")], 0.0);

        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.partial_failures, vec![failure]);
        assert_eq!(report.warnings.len(), 2);
        assert_eq!(report.warnings[0].slide, Some(5));
        assert!(report.warnings[1].message.contains("textual detector skipped"));
        assert_eq!(report.slide_count, 12);
        assert!(!report.is_clean());
    }

    #[test]
    fn test_aggregate_drops_unknown_slides() {
        let runs = vec![completed(
            DetectorKind::Numerical,
            0,
            vec![
                finding(DetectorKind::Numerical, &[1, 40], "ghost", 0.9),
                finding(DetectorKind::Numerical, &[1], "real", 0.6),
            ],
        )];
        let slides: BTreeSet<usize> = (1..=3).collect();

        let report = aggregate(runs, &slides, vec![], 0.0);

        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].description(), "real");
        assert_eq!(report.count_by_severity(Severity::Medium), 1);
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn test_aggregate_drops_findings_below_min_confidence() {
        let runs = vec![completed(
            DetectorKind::Textual,
            0,
            vec![
                finding(DetectorKind::Textual, &[1, 3], "Few competitors vs crowded market", 0.65),
                finding(DetectorKind::Textual, &[2, 3], "Launch is both done and planned", 0.7),
                finding(DetectorKind::Textual, &[1, 2], "Team size differs", 0.9),
            ],
        )];
        let slides: BTreeSet<usize> = (1..=3).collect();

        let report = aggregate(runs.clone(), &slides, vec![], 0.7);
        let kept: Vec<&str> = report.findings.iter().map(Finding::description).collect();
        assert_eq!(kept, vec!["Team size differs", "Launch is both done and planned"]);
        assert!(report.warnings.is_empty());

        let everything = aggregate(runs, &slides, vec![], 0.0);
        assert_eq!(everything.findings.len(), 3);
    }

    fn arb_finding() -> impl Strategy<Value = Finding> {
        (
            prop::sample::select(DetectorKind::ALL.to_vec()),
            prop::collection::btree_set(1usize..6, 1..3),
            prop::sample::select(vec![
                "Revenue differs",
                "revenue  differs",
                "Dates overlap",
                "Sum is 95%",
            ]),
            0u32..=10,
        )
            .prop_map(|(kind, slides, description, confidence)| {
                finding(
                    kind,
                    &slides.into_iter().collect::<Vec<_>>(),
                    description,
                    f64::from(confidence) / 10.0,
                )
            })
    }

    proptest! {
        #[test]
        fn prop_dedup_is_idempotent(findings in prop::collection::vec(arb_finding(), 0..40)) {
            let once = dedup_and_sort(findings);
            let twice = dedup_and_sort(once.clone());
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_dedup_ignores_input_order(findings in prop::collection::vec(arb_finding(), 0..30)) {
            let mut reversed = findings.clone();
            reversed.reverse();
            prop_assert_eq!(dedup_and_sort(findings), dedup_and_sort(reversed));
        }

        #[test]
        fn prop_no_duplicate_keys(findings in prop::collection::vec(arb_finding(), 0..40)) {
            let result = dedup_and_sort(findings);
            let keys: std::collections::HashSet<_> = result.iter().map(Finding::key).collect();
            prop_assert_eq!(keys.len(), result.len());
        }
    }
}

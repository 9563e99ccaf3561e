//! Batch, dispatch and aggregate in one call

use crate::aggregator::{aggregate, Report};
use crate::batching::Batcher;
use crate::config::DetectorConfig;
use crate::dispatcher::Dispatcher;
use crate::error::DetectorError;
use slidecheck_domain::{DetectorKind, SlideRecord, Warning};
use slidecheck_llm::InferenceService;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, warn};

/// Runs the enabled detectors over a deck and builds the report
pub struct Analyzer<S: InferenceService + ?Sized> {
    batcher: Batcher,
    dispatcher: Dispatcher<S>,
    kinds: Vec<DetectorKind>,
    min_confidence: f64,
}

impl<S: InferenceService + ?Sized> Analyzer<S> {
    /// Create a new analyzer
    ///
    /// Fails when `config` does not validate.
    pub fn new(service: Arc<S>, config: DetectorConfig) -> Result<Self, DetectorError> {
        let kinds = config.enabled_kinds()?;
        let batcher = Batcher::new(config.max_batch_size)?;
        let min_confidence = config.thresholds.min_confidence;
        let dispatcher = Dispatcher::new(service, config)?;
        Ok(Self {
            batcher,
            dispatcher,
            kinds,
            min_confidence,
        })
    }

    /// Detector kinds this analyzer runs
    pub fn kinds(&self) -> &[DetectorKind] {
        &self.kinds
    }

    /// Analyze `slides`; `warnings` from extraction are carried into the report
    pub async fn analyze(
        &self,
        slides: &[SlideRecord],
        mut warnings: Vec<Warning>,
    ) -> Result<Report, DetectorError> {
        if slides.is_empty() {
            warn!("Presentation has no slides; nothing to analyze");
            warnings.push(Warning::general("presentation has no slides"));
            return Ok(Report {
                warnings,
                ..Report::default()
            });
        }

        let batches = self.batcher.batch(slides);
        info!(
            slides = slides.len(),
            batches = batches.len(),
            detectors = self.kinds.len(),
            "Starting analysis"
        );

        let runs = self.dispatcher.dispatch(&batches, &self.kinds).await?;

        let indices: BTreeSet<usize> = slides.iter().map(|s| s.index).collect();
        let mut report = aggregate(runs, &indices, warnings, self.min_confidence);
        report.batch_count = batches.len();

        info!(
            findings = report.findings.len(),
            partial_failures = report.partial_failures.len(),
            clean = report.is_clean(),
            "Analysis complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slidecheck_llm::MockProvider;

    #[tokio::test]
    async fn test_empty_deck_reports_warning() {
        let provider = Arc::new(MockProvider::default());
        let analyzer = Analyzer::new(provider.clone(), DetectorConfig::default()).unwrap();

        let report = analyzer.analyze(&[], vec![]).await.unwrap();

        assert!(report.findings.is_empty());
        assert_eq!(report.warnings[0].message, "presentation has no slides");
        assert_eq!(report.batch_count, 0);
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_report_counts_batches_and_applies_min_confidence() {
        let mut provider = MockProvider::default();
        provider.add_response(
            "Slides in this batch: 1-5",
            r#"[{"slides": [1, 2], "description": "Launch date is both past and future", "confidence": 0.65}]"#,
        );
        let provider = Arc::new(provider);
        let mut config = DetectorConfig {
            max_batch_size: 5,
            enabled: vec!["textual".into()],
            ..Default::default()
        };
        config.thresholds.min_confidence = 0.7;
        let analyzer = Analyzer::new(provider.clone(), config).unwrap();

        let slides: Vec<SlideRecord> = (1..=12)
            .map(|i| SlideRecord::new(i).with_text(format!("Launch update {}", i)))
            .collect();
        let report = analyzer.analyze(&slides, vec![]).await.unwrap();

        assert_eq!(report.batch_count, 3);
        assert_eq!(provider.call_count(), 3);
        assert!(report.findings.is_empty());
        assert!(report.is_clean());
    }

    #[tokio::test]
    async fn test_only_enabled_kinds_run() {
        let provider = Arc::new(MockProvider::default());
        let config = DetectorConfig {
            enabled: vec!["timeline".into()],
            ..Default::default()
        };
        let analyzer = Analyzer::new(provider.clone(), config).unwrap();
        assert_eq!(analyzer.kinds(), &[DetectorKind::Timeline]);

        let slides = vec![SlideRecord::new(1).with_text("Launch in Q3 2024")];
        analyzer.analyze(&slides, vec![]).await.unwrap();

        assert_eq!(provider.call_count(), 1);
        assert_eq!(provider.calls_matching("Detector: timeline"), 1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = DetectorConfig {
            max_batch_size: 0,
            ..Default::default()
        };
        assert!(Analyzer::new(Arc::new(MockProvider::default()), config).is_err());
    }
}

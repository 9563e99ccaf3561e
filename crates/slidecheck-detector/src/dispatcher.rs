//! Fan-out of (batch, detector) requests to the inference service

use crate::config::DetectorConfig;
use crate::error::DetectorError;
use crate::parser::{parse_findings, ParsedFindings};
use crate::prompt::PromptBuilder;
use crate::retry::{run_with_retry, RetryOutcome, RetryPolicy};
use futures::stream::{self, StreamExt};
use slidecheck_domain::{
    Batch, BatchId, DetectorKind, Finding, PartialFailure, SeverityThresholds, SlideRecord, Warning,
};
use slidecheck_llm::{InferenceService, LlmError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, timeout, Instant};
use tracing::{debug, info, warn};

/// Result of one (batch, detector) pair
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorRun {
    /// Detector that ran
    pub kind: DetectorKind,
    /// Batch it ran on
    pub batch: BatchId,
    /// What came back
    pub outcome: RunOutcome,
}

/// Outcome of a (batch, detector) pair
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The service answered with a valid findings list
    Completed {
        /// Findings reported for the batch
        findings: Vec<Finding>,
        /// Findings dropped while parsing
        warnings: Vec<Warning>,
        /// Attempts it took
        attempts: u32,
    },
    /// Retries were exhausted; the pair contributes no findings
    Failed(PartialFailure),
}

/// Keeps request starts at least `gap` apart, across every task
struct Pacer {
    gap: Duration,
    next_start: Mutex<Option<Instant>>,
}

impl Pacer {
    fn new(gap: Duration) -> Self {
        Self {
            gap,
            next_start: Mutex::new(None),
        }
    }

    /// Wait until this caller may start a request
    async fn wait_turn(&self) {
        if self.gap.is_zero() {
            return;
        }
        // Held across the sleep so waiting callers queue up in turn
        let mut next_start = self.next_start.lock().await;
        if let Some(at) = *next_start {
            sleep_until(at).await;
        }
        *next_start = Some(Instant::now() + self.gap);
    }
}

/// Issues detector requests concurrently with bounded parallelism
///
/// The service handle is shared read-only by every request. With a
/// `request_delay_ms` set, request starts are also spaced out so that
/// per-minute quotas are not burned through at once.
pub struct Dispatcher<S: InferenceService + ?Sized> {
    service: Arc<S>,
    config: DetectorConfig,
    severity: SeverityThresholds,
    policy: RetryPolicy,
    pacer: Pacer,
}

impl<S: InferenceService + ?Sized> Dispatcher<S> {
    /// Create a new dispatcher
    pub fn new(service: Arc<S>, config: DetectorConfig) -> Result<Self, DetectorError> {
        config.validate()?;
        let policy = RetryPolicy::new(
            config.max_retries,
            Duration::from_millis(config.backoff_base_ms),
            Duration::from_millis(config.backoff_max_ms),
        )
        .with_rate_limit_wait(Duration::from_millis(config.rate_limit_wait_ms));
        Ok(Self {
            service,
            severity: config.severity(),
            pacer: Pacer::new(config.request_delay()),
            config,
            policy,
        })
    }

    /// Run every kind in `kinds` over every batch
    ///
    /// Results come back in (batch, kind) order whatever order the requests
    /// finished in. The first non-retryable error aborts the whole dispatch
    /// and drops the requests still in flight.
    pub async fn dispatch(
        &self,
        batches: &[Batch],
        kinds: &[DetectorKind],
    ) -> Result<Vec<DetectorRun>, DetectorError> {
        let jobs: Vec<(&Batch, DetectorKind)> = batches
            .iter()
            .filter(|batch| {
                let blank = batch.slides.iter().all(SlideRecord::is_empty);
                if blank {
                    debug!(batch = batch.id.value(), "Skipping batch with no content");
                }
                !blank
            })
            .flat_map(|batch| kinds.iter().map(move |kind| (batch, *kind)))
            .collect();

        info!(
            requests = jobs.len(),
            max_concurrency = self.config.max_concurrency,
            request_delay_ms = self.config.request_delay_ms,
            model = self.service.model_name(),
            "Dispatching detector requests"
        );

        let mut slots: Vec<Option<DetectorRun>> = vec![None; jobs.len()];
        let mut pending = stream::iter(jobs.into_iter().enumerate())
            .map(|(slot, (batch, kind))| async move {
                (slot, self.run_pair(batch, kind).await)
            })
            .buffer_unordered(self.config.max_concurrency);

        while let Some((slot, result)) = pending.next().await {
            slots[slot] = Some(result?);
        }

        Ok(slots.into_iter().flatten().collect())
    }

    async fn run_pair(
        &self,
        batch: &Batch,
        kind: DetectorKind,
    ) -> Result<DetectorRun, DetectorError> {
        let prompt = PromptBuilder::new(kind, batch, &self.config.thresholds).build();
        let timeout_secs = self.config.request_timeout_secs;

        let outcome = run_with_retry(&self.policy, |attempt| {
            let prompt = prompt.as_str();
            async move {
                self.pacer.wait_turn().await;
                debug!(
                    kind = kind.as_str(),
                    batch = batch.id.value(),
                    attempt,
                    "Sending detector request"
                );
                let response = timeout(
                    self.config.request_timeout(),
                    self.service.generate_structured(prompt),
                )
                .await
                .map_err(|_| LlmError::Timeout(timeout_secs))??;

                parse_findings(&response, kind, batch, &self.severity)
                    .map_err(LlmError::from)
            }
        })
        .await;

        let outcome = match outcome {
            RetryOutcome::Succeeded {
                value: ParsedFindings { findings, warnings },
                attempts,
            } => {
                info!(
                    kind = kind.as_str(),
                    batch = batch.id.value(),
                    findings = findings.len(),
                    attempts,
                    "Detector completed"
                );
                RunOutcome::Completed {
                    findings,
                    warnings,
                    attempts,
                }
            }
            RetryOutcome::Exhausted { error, attempts } => {
                let failure = PartialFailure {
                    kind,
                    batch: batch.id,
                    reason: error.to_string(),
                    attempts,
                };
                warn!(
                    kind = kind.as_str(),
                    batch = batch.id.value(),
                    attempts,
                    "{}",
                    failure
                );
                RunOutcome::Failed(failure)
            }
            RetryOutcome::Fatal { error, .. } => {
                return Err(DetectorError::FatalService {
                    kind,
                    batch: batch.id,
                    source: error,
                });
            }
        };

        Ok(DetectorRun {
            kind,
            batch: batch.id,
            outcome,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batching::Batcher;
    use slidecheck_llm::MockProvider;

    fn config() -> DetectorConfig {
        DetectorConfig {
            max_batch_size: 2,
            max_concurrency: 3,
            max_retries: 1,
            backoff_base_ms: 0,
            backoff_max_ms: 0,
            ..Default::default()
        }
    }

    fn batches(count: usize, size: usize) -> Vec<Batch> {
        let slides: Vec<SlideRecord> = (1..=count)
            .map(|i| SlideRecord::new(i).with_text(format!("Revenue line {}", i)))
            .collect();
        Batcher::new(size).unwrap().batch(&slides)
    }

    #[tokio::test]
    async fn test_every_pair_dispatched_in_order() {
        let provider = Arc::new(MockProvider::default());
        let dispatcher = Dispatcher::new(provider.clone(), config()).unwrap();

        let runs = dispatcher
            .dispatch(&batches(5, 2), &DetectorKind::ALL)
            .await
            .unwrap();

        assert_eq!(runs.len(), 12);
        assert_eq!(provider.call_count(), 12);
        assert_eq!(runs[0].batch, BatchId(0));
        assert_eq!(runs[0].kind, DetectorKind::Numerical);
        assert_eq!(runs[11].batch, BatchId(2));
        assert_eq!(runs[11].kind, DetectorKind::Timeline);
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let provider = Arc::new(MockProvider::default().with_delay(Duration::from_millis(20)));
        let dispatcher = Dispatcher::new(provider.clone(), config()).unwrap();

        dispatcher
            .dispatch(&batches(8, 2), &DetectorKind::ALL)
            .await
            .unwrap();

        assert_eq!(provider.call_count(), 16);
        assert!(provider.max_in_flight() <= 3);
        assert!(provider.max_in_flight() > 1);
    }

    #[tokio::test]
    async fn test_exhausted_pair_becomes_partial_failure() {
        let mut provider = MockProvider::default();
        provider.push_failures("Detector: percentage", LlmError::RateLimitExceeded, 100);
        let provider = Arc::new(provider);
        let dispatcher = Dispatcher::new(provider.clone(), config()).unwrap();

        let runs = dispatcher
            .dispatch(&batches(2, 2), &DetectorKind::ALL)
            .await
            .unwrap();

        assert_eq!(runs.len(), 4);
        match &runs[1].outcome {
            RunOutcome::Failed(failure) => {
                assert_eq!(failure.kind, DetectorKind::Percentage);
                assert_eq!(failure.attempts, 2);
                assert_eq!(failure.reason, "Rate limit exceeded");
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert!(matches!(runs[0].outcome, RunOutcome::Completed { .. }));
        assert_eq!(provider.calls_matching("Detector: percentage"), 2);
    }

    #[tokio::test]
    async fn test_unparseable_response_is_retried() {
        let mut provider = MockProvider::default();
        provider.add_response("Detector: timeline", "Sorry, I cannot help with that.");
        let provider = Arc::new(provider);
        let dispatcher = Dispatcher::new(provider.clone(), config()).unwrap();

        let runs = dispatcher
            .dispatch(&batches(1, 2), &[DetectorKind::Timeline])
            .await
            .unwrap();

        assert!(matches!(&runs[0].outcome, RunOutcome::Failed(f) if f.attempts == 2));
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn test_fatal_error_aborts_dispatch() {
        let mut provider = MockProvider::default();
        provider.add_error(
            "Detector: textual",
            LlmError::Authentication("API key invalid".into()),
        );
        let dispatcher = Dispatcher::new(Arc::new(provider), config()).unwrap();

        let result = dispatcher.dispatch(&batches(4, 2), &DetectorKind::ALL).await;

        match result {
            Err(DetectorError::FatalService { kind, source, .. }) => {
                assert_eq!(kind, DetectorKind::Textual);
                assert!(matches!(source, LlmError::Authentication(_)));
            }
            other => panic!("expected fatal error, got {:?}", other.map(|r| r.len())),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_timeout_is_transient() {
        let provider = Arc::new(MockProvider::default().with_delay(Duration::from_secs(120)));
        let config = DetectorConfig {
            request_timeout_secs: 5,
            max_retries: 0,
            ..config()
        };
        let dispatcher = Dispatcher::new(provider, config).unwrap();

        let runs = dispatcher
            .dispatch(&batches(1, 2), &[DetectorKind::Numerical])
            .await
            .unwrap();

        match &runs[0].outcome {
            RunOutcome::Failed(failure) => assert!(failure.reason.contains("timed out after 5s")),
            other => panic!("expected timeout failure, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_starts_are_spaced_out() {
        let provider = Arc::new(MockProvider::default());
        let config = DetectorConfig {
            request_delay_ms: 8_000,
            ..config()
        };
        let dispatcher = Dispatcher::new(provider.clone(), config).unwrap();
        let start = Instant::now();

        dispatcher
            .dispatch(&batches(1, 2), &DetectorKind::ALL[..3])
            .await
            .unwrap();

        assert_eq!(provider.call_count(), 3);
        assert!(start.elapsed() >= Duration::from_secs(16));
        assert!(start.elapsed() < Duration::from_secs(24));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_request_waits_longer() {
        let mut provider = MockProvider::default();
        provider.push_failures("Detector: numerical", LlmError::RateLimitExceeded, 1);
        let provider = Arc::new(provider);
        let config = DetectorConfig {
            rate_limit_wait_ms: 60_000,
            ..config()
        };
        let dispatcher = Dispatcher::new(provider.clone(), config).unwrap();
        let start = Instant::now();

        let runs = dispatcher
            .dispatch(&batches(1, 2), &[DetectorKind::Numerical])
            .await
            .unwrap();

        assert!(matches!(
            runs[0].outcome,
            RunOutcome::Completed { attempts: 2, .. }
        ));
        assert!(start.elapsed() >= Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_blank_batches_are_skipped() {
        let provider = Arc::new(MockProvider::default());
        let dispatcher = Dispatcher::new(provider.clone(), config()).unwrap();
        let blank = vec![Batch::new(BatchId(0), vec![SlideRecord::new(1)])];

        let runs = dispatcher.dispatch(&blank, &DetectorKind::ALL).await.unwrap();

        assert!(runs.is_empty());
        assert_eq!(provider.call_count(), 0);
    }
}

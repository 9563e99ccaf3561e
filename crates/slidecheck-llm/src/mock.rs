//! Deterministic service doubles
//!
//! No network calls. Responses are picked by substring match on the prompt
//! (or by image name for OCR), so tests can script each detector and each
//! batch independently.

use crate::provider::{ImageData, InferenceService, OcrService};
use crate::LlmError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[derive(Debug, Clone)]
enum Scripted {
    Respond(String),
    Fail(LlmError),
}

#[derive(Debug)]
struct InjectedFailure {
    matcher: String,
    error: LlmError,
    remaining: usize,
}

/// Mock inference provider for deterministic testing
///
/// Clones share their scripted responses and counters.
///
/// # Examples
///
/// ```
/// use slidecheck_llm::{InferenceService, LlmError, MockProvider};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let mut provider = MockProvider::new("[]");
/// provider.add_response("Detector: numerical", r#"[{"slides":[1],"description":"x","confidence":0.9}]"#);
/// provider.push_failures("Detector: timeline", LlmError::RateLimitExceeded, 1);
///
/// assert!(provider.generate("Detector: timeline").await.is_err());
/// assert_eq!(provider.generate("Detector: timeline").await.unwrap(), "[]");
/// assert_eq!(provider.call_count(), 2);
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    model: String,
    default_response: String,
    responses: Arc<Mutex<Vec<(String, Scripted)>>>,
    failures: Arc<Mutex<Vec<InjectedFailure>>>,
    prompts: Arc<Mutex<Vec<String>>>,
    delay: Option<Duration>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl MockProvider {
    /// Create a new MockProvider with a fixed response for all prompts
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            model: "mock".to_string(),
            default_response: response.into(),
            responses: Arc::new(Mutex::new(Vec::new())),
            failures: Arc::new(Mutex::new(Vec::new())),
            prompts: Arc::new(Mutex::new(Vec::new())),
            delay: None,
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Sleep this long inside every call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Respond with `response` to prompts containing `matcher`
    ///
    /// Earlier rules win when several match.
    pub fn add_response(&mut self, matcher: impl Into<String>, response: impl Into<String>) {
        lock(&self.responses).push((matcher.into(), Scripted::Respond(response.into())));
    }

    /// Always fail prompts containing `matcher` with `error`
    pub fn add_error(&mut self, matcher: impl Into<String>, error: LlmError) {
        lock(&self.responses).push((matcher.into(), Scripted::Fail(error)));
    }

    /// Fail the next `times` prompts containing `matcher`, then fall through
    /// to the normal responses
    pub fn push_failures(&mut self, matcher: impl Into<String>, error: LlmError, times: usize) {
        lock(&self.failures).push(InjectedFailure {
            matcher: matcher.into(),
            error,
            remaining: times,
        });
    }

    /// Get the number of times the provider was called
    pub fn call_count(&self) -> usize {
        lock(&self.prompts).len()
    }

    /// Number of calls whose prompt contained `matcher`
    pub fn calls_matching(&self, matcher: &str) -> usize {
        lock(&self.prompts)
            .iter()
            .filter(|p| p.contains(matcher))
            .count()
    }

    /// Every prompt received, in call order
    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }

    /// Highest number of calls observed running at the same time
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn scripted(&self, prompt: &str) -> Result<String, LlmError> {
        {
            let mut failures = lock(&self.failures);
            if let Some(failure) = failures
                .iter_mut()
                .find(|f| f.remaining > 0 && prompt.contains(&f.matcher))
            {
                failure.remaining -= 1;
                return Err(failure.error.clone());
            }
        }

        let responses = lock(&self.responses);
        match responses.iter().find(|(m, _)| prompt.contains(m.as_str())) {
            Some((_, Scripted::Respond(r))) => Ok(r.clone()),
            Some((_, Scripted::Fail(e))) => Err(e.clone()),
            None => Ok(self.default_response.clone()),
        }
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new("[]")
    }
}

/// Decrements the in-flight counter even when the call future is dropped
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize, max: &AtomicUsize) -> Self {
        let now = counter.fetch_add(1, Ordering::SeqCst) + 1;
        max.fetch_max(now, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl InferenceService for MockProvider {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        lock(&self.prompts).push(prompt.to_string());
        let _guard = InFlight::enter(&self.in_flight, &self.max_in_flight);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.scripted(prompt)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Mock OCR service keyed by image name
#[derive(Debug, Clone)]
pub struct MockOcr {
    default_text: String,
    results: Arc<Mutex<HashMap<String, Result<String, LlmError>>>>,
    seen: Arc<Mutex<Vec<String>>>,
}

impl MockOcr {
    /// Return `default_text` for every image without a specific result
    pub fn new(default_text: impl Into<String>) -> Self {
        Self {
            default_text: default_text.into(),
            results: Arc::new(Mutex::new(HashMap::new())),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Return `text` for the image named `name`
    pub fn add_text(&mut self, name: impl Into<String>, text: impl Into<String>) {
        lock(&self.results).insert(name.into(), Ok(text.into()));
    }

    /// Fail OCR for the image named `name`
    pub fn add_failure(&mut self, name: impl Into<String>, error: LlmError) {
        lock(&self.results).insert(name.into(), Err(error));
    }

    /// Image names processed, in call order
    pub fn seen(&self) -> Vec<String> {
        lock(&self.seen).clone()
    }

    /// Number of images processed
    pub fn call_count(&self) -> usize {
        lock(&self.seen).len()
    }
}

impl Default for MockOcr {
    fn default() -> Self {
        Self::new("")
    }
}

#[async_trait]
impl OcrService for MockOcr {
    async fn extract_text(&self, image: &ImageData) -> Result<String, LlmError> {
        lock(&self.seen).push(image.name.clone());
        lock(&self.results)
            .get(&image.name)
            .cloned()
            .unwrap_or_else(|| Ok(self.default_text.clone()))
    }
}

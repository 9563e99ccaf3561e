//! Gemini Provider Implementation
//!
//! Talks to the Google Generative Language `generateContent` REST API.
//!
//! # Features
//!
//! - Async HTTP communication with a shared `reqwest::Client`
//! - JSON response mode for structured generation
//! - Inline image parts for OCR
//! - HTTP status mapped onto [`LlmError`]
//!
//! Retrying is NOT done here. The dispatcher owns the retry state machine so
//! that every attempt is visible to it.
//!
//! # Examples
//!
//! ```no_run
//! use slidecheck_llm::GeminiProvider;
//!
//! let provider = GeminiProvider::from_env("GEMINI_API_KEY", "gemini-2.0-flash", 60)
//!     .expect("GEMINI_API_KEY must be set");
//! ```

use crate::provider::{ImageData, InferenceService, OcrService};
use crate::LlmError;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

/// Default Gemini API base URL
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default model
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Default timeout for a single request (60 seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Default environment variable holding the API key
pub const DEFAULT_API_KEY_ENV: &str = "GEMINI_API_KEY";

const OCR_PROMPT: &str = "Extract all visible text from this slide image. Include:
- All text content, headings, bullet points
- Numbers, percentages, financial figures
- Chart labels and data points
- Any other readable text

Return clean, structured text preserving hierarchy. If the image contains no text, return nothing.";

const SAFETY_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

/// Gemini API provider
///
/// Cheap to share: wrap it in an `Arc` and hand it to the extractor and the
/// dispatcher.
pub struct GeminiProvider {
    endpoint: String,
    model: String,
    api_key: String,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Request body for `generateContent`
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
    safety_settings: Vec<SafetySetting>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text {
        text: &'a str,
    },
    Image {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
}

#[derive(Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

/// Response from `generateContent`
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl GeminiProvider {
    /// Create a new Gemini provider
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::MissingApiKey`] for a blank key and
    /// [`LlmError::Other`] if the HTTP client cannot be built.
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, LlmError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(LlmError::MissingApiKey("<api key>".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| LlmError::Other(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: model.into(),
            api_key,
            timeout_secs,
            client,
        })
    }

    /// Create a provider reading the API key from `env_var`
    pub fn from_env(
        env_var: &str,
        model: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, LlmError> {
        let key = std::env::var(env_var)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| LlmError::MissingApiKey(env_var.to_string()))?;
        Self::new(key, model, timeout_secs)
    }

    /// Point the provider at a different API base URL
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }

    async fn send(&self, parts: Vec<Part<'_>>, json_mode: bool) -> Result<String, LlmError> {
        let body = GenerateContentRequest {
            contents: vec![Content { parts }],
            generation_config: GenerationConfig {
                temperature: 0.1,
                response_mime_type: json_mode.then_some("application/json"),
            },
            safety_settings: SAFETY_CATEGORIES
                .iter()
                .map(|&category| SafetySetting {
                    category,
                    threshold: "BLOCK_NONE",
                })
                .collect(),
        };

        debug!(model = %self.model, json_mode, "Sending generateContent request");

        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            warn!(status = status.as_u16(), model = %self.model, "Gemini request failed");
            return Err(classify_status(status.as_u16(), &text, &self.model));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        response_text(parsed)
    }

    fn map_transport_error(&self, err: reqwest::Error) -> LlmError {
        if err.is_timeout() {
            LlmError::Timeout(self.timeout_secs)
        } else {
            LlmError::Communication(format!("Request failed: {}", err))
        }
    }
}

/// Map a non-success HTTP status onto the error taxonomy
pub fn classify_status(status: u16, body: &str, model: &str) -> LlmError {
    let message = truncate(body.trim(), 300);
    match status {
        429 => LlmError::RateLimitExceeded,
        401 | 403 => LlmError::Authentication(message),
        404 => LlmError::ModelNotAvailable(model.to_string()),
        400 => LlmError::InvalidRequest(message),
        408 => LlmError::Communication(format!("HTTP 408: {}", message)),
        500..=599 => LlmError::Server { status, message },
        _ => LlmError::Other(format!("HTTP {}: {}", status, message)),
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

/// Concatenated text of the first candidate
fn response_text(response: GenerateContentResponse) -> Result<String, LlmError> {
    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(LlmError::InvalidResponse(format!("Prompt blocked: {}", reason)));
    }

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::InvalidResponse("No candidates in response".to_string()))?;

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    let text = text.trim();
    if text.is_empty() {
        let reason = candidate.finish_reason.unwrap_or_else(|| "unknown".to_string());
        return Err(LlmError::InvalidResponse(format!(
            "Empty response (finish reason: {})",
            reason
        )));
    }
    Ok(text.to_string())
}

#[async_trait]
impl InferenceService for GeminiProvider {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        self.send(vec![Part::Text { text: prompt }], false).await
    }

    async fn generate_structured(&self, prompt: &str) -> Result<String, LlmError> {
        self.send(vec![Part::Text { text: prompt }], true).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl OcrService for GeminiProvider {
    async fn extract_text(&self, image: &ImageData) -> Result<String, LlmError> {
        if !image.is_supported() {
            return Err(LlmError::InvalidRequest(format!(
                "Unsupported image format {} for {}",
                image.mime_type, image.name
            )));
        }

        let parts = vec![
            Part::Text { text: OCR_PROMPT },
            Part::Image {
                inline_data: InlineData {
                    mime_type: image.mime_type.clone(),
                    data: BASE64.encode(&image.bytes),
                },
            },
        ];

        match self.send(parts, false).await {
            Ok(text) => Ok(text),
            // A finished candidate with no text means the image has none
            Err(LlmError::InvalidResponse(msg)) if msg.starts_with("Empty response") => {
                Ok(String::new())
            }
            Err(e) => Err(e),
        }
    }
}

//! Provider traits shared by the extractor and the detector dispatcher

use crate::LlmError;
use async_trait::async_trait;
use std::path::Path;

/// Text generation backend
///
/// Implementations must be safe to call from many tasks at once; the
/// dispatcher holds a single `Arc<dyn InferenceService>` for the whole run.
#[async_trait]
pub trait InferenceService: Send + Sync {
    /// Generate free-form text for a prompt
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;

    /// Generate a response that is expected to be JSON
    ///
    /// Providers that support a JSON response mode override this. The
    /// default falls back to [`InferenceService::generate`].
    async fn generate_structured(&self, prompt: &str) -> Result<String, LlmError> {
        self.generate(prompt).await
    }

    /// Model identifier, for logging
    fn model_name(&self) -> &str;
}

/// Image-to-text backend used for slide pictures
#[async_trait]
pub trait OcrService: Send + Sync {
    /// Extract the visible text from an image
    ///
    /// An image without text yields an empty string, not an error.
    async fn extract_text(&self, image: &ImageData) -> Result<String, LlmError>;
}

/// Raw image bytes plus what is needed to send them inline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    /// File name, e.g. `image3.png` or `slide_5.png`
    pub name: String,
    /// MIME type, e.g. `image/png`
    pub mime_type: String,
    /// Encoded image bytes
    pub bytes: Vec<u8>,
}

impl ImageData {
    /// Wrap image bytes, guessing the MIME type from the file extension
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let mime_type = guess_mime_type(&name).to_string();
        Self {
            name,
            mime_type,
            bytes,
        }
    }

    /// Whether the MIME type is one the inference service accepts inline
    pub fn is_supported(&self) -> bool {
        matches!(
            self.mime_type.as_str(),
            "image/png" | "image/jpeg" | "image/gif" | "image/webp" | "image/bmp" | "image/tiff"
        )
    }
}

fn guess_mime_type(name: &str) -> &'static str {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "emf" => "image/x-emf",
        "wmf" => "image/x-wmf",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_type_guessing() {
        assert_eq!(ImageData::from_bytes("slide_5.PNG", vec![]).mime_type, "image/png");
        assert_eq!(ImageData::from_bytes("photo.jpeg", vec![]).mime_type, "image/jpeg");
        assert_eq!(ImageData::from_bytes("chart.emf", vec![]).mime_type, "image/x-emf");
        assert_eq!(
            ImageData::from_bytes("noext", vec![]).mime_type,
            "application/octet-stream"
        );
    }

    #[test]
    fn test_supported_formats() {
        assert!(ImageData::from_bytes("a.png", vec![1]).is_supported());
        assert!(ImageData::from_bytes("a.jpg", vec![1]).is_supported());
        assert!(!ImageData::from_bytes("a.emf", vec![1]).is_supported());
        assert!(!ImageData::from_bytes("a.svg", vec![1]).is_supported());
    }
}

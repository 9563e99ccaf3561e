//! Error types for the Content Extractor

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort extraction
///
/// OCR problems are never reported here; they degrade to warnings.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// Presentation file does not exist
    #[error("PowerPoint file not found: {0}")]
    NotFound(PathBuf),

    /// Path exists but is not a regular file
    #[error("Not a file: {0}")]
    NotAFile(PathBuf),

    /// File does not carry a `.pptx` extension
    #[error("File must be a .pptx file: {0}")]
    UnsupportedExtension(PathBuf),

    /// Slide image directory does not exist
    #[error("Image directory not found: {0}")]
    ImageDirNotFound(PathBuf),

    /// Slide image path is not a directory
    #[error("Image path must be a directory: {0}")]
    ImageDirNotDirectory(PathBuf),

    /// File could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File being read
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Not a ZIP container, or a required part is missing
    #[error("Invalid presentation container: {0}")]
    InvalidContainer(String),

    /// A part exists but its XML is malformed
    #[error("Malformed XML in {part}: {message}")]
    Xml {
        /// Part name inside the container
        part: String,
        /// Parser message
        message: String,
    },
}

impl From<zip::result::ZipError> for ExtractionError {
    fn from(e: zip::result::ZipError) -> Self {
        ExtractionError::InvalidContainer(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            ExtractionError::UnsupportedExtension(PathBuf::from("deck.ppt")).to_string(),
            "File must be a .pptx file: deck.ppt"
        );
        assert_eq!(
            ExtractionError::Xml {
                part: "ppt/slides/slide1.xml".into(),
                message: "unexpected end".into()
            }
            .to_string(),
            "Malformed XML in ppt/slides/slide1.xml: unexpected end"
        );
    }

    #[test]
    fn test_zip_error_is_invalid_container() {
        let err: ExtractionError = zip::result::ZipError::InvalidArchive("bad").into();
        assert!(matches!(err, ExtractionError::InvalidContainer(_)));
    }
}

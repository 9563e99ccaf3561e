//! SlideCheck Content Extractor
//!
//! Turns a `.pptx` file into one [`SlideRecord`](slidecheck_domain::SlideRecord)
//! per slide.
//!
//! # Architecture
//!
//! ```text
//! .pptx (ZIP) → presentation.xml slide list → slide XML → SlideRecord
//!                                           ↘ pictures → OcrService → image text
//! ```
//!
//! # Key Features
//!
//! - **Document order**: slides follow `p:sldIdLst`, not part names
//! - **Tables**: row/column structure kept, empty cells as empty strings
//! - **Speaker notes**: read from each slide's notes part
//! - **Best-effort OCR**: a failing image becomes a warning, never an error
//!
//! # Example Usage
//!
//! ```no_run
//! use slidecheck_extractor::ContentExtractor;
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let extraction = ContentExtractor::new()
//!     .extract(Path::new("deck.pptx"))
//!     .await?;
//!
//! for slide in &extraction.slides {
//!     println!("{}: {:?}", slide.index, slide.title);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod error;
mod extractor;
mod images;
mod package;
mod text;
mod xml;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;

pub use error::ExtractionError;
pub use extractor::{validate_input, ContentExtractor, Extraction};
pub use images::{find_slide_image, validate_image_dir};
pub use text::clean_text;

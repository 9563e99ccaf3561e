//! Core Content Extractor implementation

use crate::error::ExtractionError;
use crate::images::{find_slide_image, validate_image_dir};
use crate::package::{resolve_relationship, PptxPackage};
use crate::text::clean_text;
use crate::xml;
use slidecheck_domain::{SlideRecord, Warning};
use slidecheck_llm::{ImageData, OcrService};
use std::io::{Cursor, Read, Seek};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of extracting one presentation
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// One record per slide, in document order
    pub slides: Vec<SlideRecord>,
    /// Non-fatal problems (OCR failures, unreadable images)
    pub warnings: Vec<Warning>,
}

/// A slide before OCR: the record, the images still to be read and any
/// parts that could not be found
struct PendingSlide {
    record: SlideRecord,
    images: Vec<ImageData>,
    warnings: Vec<Warning>,
}

/// Extracts normalized slide records from a `.pptx` file
///
/// OCR is optional. Without an OCR service, embedded images and the slide
/// image directory are ignored.
#[derive(Clone, Default)]
pub struct ContentExtractor {
    ocr: Option<Arc<dyn OcrService>>,
    image_dir: Option<PathBuf>,
}

impl ContentExtractor {
    /// Create an extractor without OCR
    pub fn new() -> Self {
        Self::default()
    }

    /// Send embedded images (and slide renders, if configured) to `ocr`
    pub fn with_ocr(mut self, ocr: Arc<dyn OcrService>) -> Self {
        self.ocr = Some(ocr);
        self
    }

    /// Also OCR pre-rendered slide images found in `dir`
    pub fn with_image_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.image_dir = Some(dir.into());
        self
    }

    /// Extract every slide of the presentation at `path`
    ///
    /// # Errors
    ///
    /// Fails if the file is missing, is not a `.pptx`, cannot be read, or is
    /// not a valid presentation container. Also fails if a configured image
    /// directory is missing.
    pub async fn extract(&self, path: &Path) -> Result<Extraction, ExtractionError> {
        validate_input(path)?;
        if let Some(dir) = &self.image_dir {
            validate_image_dir(dir)?;
        }

        info!(path = %path.display(), "Starting presentation content extraction");

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| ExtractionError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        self.extract_bytes(bytes).await
    }

    /// Extract from an in-memory `.pptx` container
    pub async fn extract_bytes(&self, bytes: Vec<u8>) -> Result<Extraction, ExtractionError> {
        let pending = read_slides(Cursor::new(bytes))?;
        let mut warnings = Vec::new();
        let mut slides = Vec::with_capacity(pending.len());

        for mut slide in pending {
            warnings.append(&mut slide.warnings);
            slides.push(self.finish_slide(slide, &mut warnings).await);
        }

        info!(
            slides = slides.len(),
            warnings = warnings.len(),
            "Extracted presentation content"
        );
        Ok(Extraction { slides, warnings })
    }

    async fn finish_slide(&self, slide: PendingSlide, warnings: &mut Vec<Warning>) -> SlideRecord {
        let PendingSlide {
            mut record,
            images,
            ..
        } = slide;
        let Some(ocr) = &self.ocr else {
            return record;
        };
        let index = record.index;

        for image in images {
            if !image.is_supported() {
                debug!(
                    slide = index,
                    image = %image.name,
                    mime = %image.mime_type,
                    "Skipping image format OCR cannot read"
                );
                continue;
            }
            if let Some(text) = run_ocr(ocr.as_ref(), index, &image, warnings).await {
                record.image_text.push(text);
            }
        }

        if let Some(dir) = &self.image_dir {
            if let Some(path) = find_slide_image(dir, index) {
                match tokio::fs::read(&path).await {
                    Ok(bytes) => {
                        let name = path
                            .file_name()
                            .map(|n| n.to_string_lossy().into_owned())
                            .unwrap_or_default();
                        let image = ImageData::from_bytes(name, bytes);
                        if let Some(text) = run_ocr(ocr.as_ref(), index, &image, warnings).await {
                            record.image_text.push(text);
                        }
                    }
                    Err(e) => {
                        warn!(
                            slide = index,
                            path = %path.display(),
                            error = %e,
                            "Failed to read slide image"
                        );
                        warnings.push(Warning::for_slide(
                            index,
                            format!("could not read slide image {}: {}", path.display(), e),
                        ));
                    }
                }
            } else {
                debug!(slide = index, "No slide image found");
            }
        }

        record
    }
}

/// OCR one image; failures become a warning and no text
async fn run_ocr(
    ocr: &dyn OcrService,
    slide: usize,
    image: &ImageData,
    warnings: &mut Vec<Warning>,
) -> Option<String> {
    match ocr.extract_text(image).await {
        Ok(text) => {
            let text = clean_text(&text);
            debug!(slide, image = %image.name, chars = text.len(), "Extracted image text");
            (!text.is_empty()).then_some(text)
        }
        Err(e) => {
            warn!(slide, image = %image.name, error = %e, "OCR failed");
            warnings.push(Warning::for_slide(
                slide,
                format!("OCR failed for image {}: {}", image.name, e),
            ));
            None
        }
    }
}

/// Check that `path` is an existing `.pptx` file
pub fn validate_input(path: &Path) -> Result<(), ExtractionError> {
    if !path.exists() {
        return Err(ExtractionError::NotFound(path.to_path_buf()));
    }
    if !path.is_file() {
        return Err(ExtractionError::NotAFile(path.to_path_buf()));
    }
    let is_pptx = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pptx"));
    if !is_pptx {
        return Err(ExtractionError::UnsupportedExtension(path.to_path_buf()));
    }
    Ok(())
}

fn read_slides<R: Read + Seek>(reader: R) -> Result<Vec<PendingSlide>, ExtractionError> {
    let mut package = PptxPackage::new(reader)?;
    let parts = package.slide_parts()?;
    let mut slides = Vec::with_capacity(parts.len());

    for (i, part) in parts.iter().enumerate() {
        let index = i + 1;
        debug!(slide = index, part = %part, "Processing slide");

        let xml_text = package
            .read_xml(part)?
            .ok_or_else(|| ExtractionError::InvalidContainer(format!("missing {}", part)))?;
        let parsed = xml::parse_slide(&xml_text, part)?;
        let rels = package.relationships(part)?;

        let mut warnings = Vec::new();
        let mut record = SlideRecord::new(index);
        record.title = parsed.title;
        record.text_blocks = parsed.text_blocks;
        record.tables = parsed.tables;

        if let Some(notes_rel) = rels.iter().find(|r| r.kind() == "notesSlide") {
            if let Some(notes_part) = resolve_relationship(part, &rels, &notes_rel.id) {
                match package.read_xml(&notes_part)? {
                    Some(notes_xml) => record.notes = xml::parse_notes(&notes_xml, &notes_part)?,
                    None => {
                        warn!(slide = index, part = %notes_part, "Notes part missing");
                        warnings.push(Warning::for_slide(
                            index,
                            format!("speaker notes part {} is missing", notes_part),
                        ));
                    }
                }
            }
        }

        let mut images = Vec::new();
        for id in &parsed.image_refs {
            let Some(media) = resolve_relationship(part, &rels, id) else {
                continue;
            };
            match package.read_bytes(&media)? {
                Some(bytes) => {
                    let name = media.rsplit('/').next().unwrap_or(media.as_str()).to_string();
                    images.push(ImageData::from_bytes(name, bytes));
                }
                None => {
                    warn!(slide = index, part = %media, "Image part missing");
                    warnings.push(Warning::for_slide(
                        index,
                        format!("image part {} is missing", media),
                    ));
                }
            }
        }

        slides.push(PendingSlide {
            record,
            images,
            warnings,
        });
    }

    Ok(slides)
}

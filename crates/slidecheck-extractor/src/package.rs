//! OOXML container access: parts, relationships and slide order

use crate::error::ExtractionError;
use crate::xml::{self, Relationship};
use std::io::{Read, Seek};
use tracing::{debug, warn};
use zip::result::ZipError;
use zip::ZipArchive;

const PRESENTATION_PART: &str = "ppt/presentation.xml";

/// Upper bound on the buffer reserved up front for a part; the declared
/// size comes from the archive and is not trusted beyond this
const MAX_PREALLOC_BYTES: usize = 8 * 1024 * 1024;

/// An opened `.pptx` container
pub(crate) struct PptxPackage<R: Read + Seek> {
    archive: ZipArchive<R>,
}

impl<R: Read + Seek> PptxPackage<R> {
    /// Open a container; fails if it is not a ZIP or has no presentation part
    pub fn new(reader: R) -> Result<Self, ExtractionError> {
        let archive = ZipArchive::new(reader)?;
        let package = Self { archive };
        if !package.has_part(PRESENTATION_PART) {
            return Err(ExtractionError::InvalidContainer(format!(
                "missing {}",
                PRESENTATION_PART
            )));
        }
        Ok(package)
    }

    fn has_part(&self, name: &str) -> bool {
        self.archive.file_names().any(|n| n == name)
    }

    /// Raw bytes of a part, `None` if absent
    pub fn read_bytes(&mut self, name: &str) -> Result<Option<Vec<u8>>, ExtractionError> {
        let mut file = match self.archive.by_name(name) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut bytes = Vec::with_capacity(capacity_hint(file.size()));
        file.read_to_end(&mut bytes)
            .map_err(|e| ExtractionError::InvalidContainer(format!("{}: {}", name, e)))?;
        Ok(Some(bytes))
    }

    /// A part decoded as UTF-8 XML, `None` if absent
    pub fn read_xml(&mut self, name: &str) -> Result<Option<String>, ExtractionError> {
        match self.read_bytes(name)? {
            Some(bytes) => {
                let text = String::from_utf8(bytes).map_err(|e| ExtractionError::Xml {
                    part: name.to_string(),
                    message: e.to_string(),
                })?;
                Ok(Some(text))
            }
            None => Ok(None),
        }
    }

    /// Relationships of `part`; a part without a `.rels` file has none
    pub fn relationships(&mut self, part: &str) -> Result<Vec<Relationship>, ExtractionError> {
        let rels_part = rels_path_for(part);
        match self.read_xml(&rels_part)? {
            Some(xml) => xml::parse_relationships(&xml, &rels_part),
            None => Ok(Vec::new()),
        }
    }

    /// Slide part names in presentation order
    ///
    /// Follows `p:sldIdLst`; falls back to the numeric suffix of
    /// `ppt/slides/slideN.xml` when the list is missing or empty.
    pub fn slide_parts(&mut self) -> Result<Vec<String>, ExtractionError> {
        let presentation = self
            .read_xml(PRESENTATION_PART)?
            .ok_or_else(|| {
                ExtractionError::InvalidContainer(format!("missing {}", PRESENTATION_PART))
            })?;

        let ids = xml::parse_slide_id_list(&presentation, PRESENTATION_PART)?;
        if ids.is_empty() {
            debug!("No slide id list, ordering slides by part name");
            return Ok(self.slide_parts_by_name());
        }

        let rels = self.relationships(PRESENTATION_PART)?;
        let mut parts = Vec::with_capacity(ids.len());
        for id in &ids {
            match rels.iter().find(|r| &r.id == id && r.kind() == "slide") {
                Some(rel) => {
                    let target = resolve_target(PRESENTATION_PART, &rel.target);
                    if self.has_part(&target) {
                        parts.push(target);
                    } else {
                        return Err(ExtractionError::InvalidContainer(format!(
                            "slide part {} listed but missing",
                            target
                        )));
                    }
                }
                None => {
                    return Err(ExtractionError::InvalidContainer(format!(
                        "slide relationship {} not found",
                        id
                    )))
                }
            }
        }
        Ok(parts)
    }

    fn slide_parts_by_name(&self) -> Vec<String> {
        let mut numbered: Vec<(u32, String)> = self
            .archive
            .file_names()
            .filter_map(|name| {
                let n = name
                    .strip_prefix("ppt/slides/slide")?
                    .strip_suffix(".xml")?
                    .parse::<u32>()
                    .ok()?;
                Some((n, name.to_string()))
            })
            .collect();
        numbered.sort();
        numbered.into_iter().map(|(_, name)| name).collect()
    }
}

/// Resolve the internal target of relationship `id` on `part`
pub(crate) fn resolve_relationship(part: &str, rels: &[Relationship], id: &str) -> Option<String> {
    let rel = rels.iter().find(|r| r.id == id)?;
    if rel.external {
        warn!(part, id, "Skipping external relationship target");
        return None;
    }
    Some(resolve_target(part, &rel.target))
}

/// Buffer size to reserve for a part that declares `declared` bytes
fn capacity_hint(declared: u64) -> usize {
    usize::try_from(declared)
        .unwrap_or(usize::MAX)
        .min(MAX_PREALLOC_BYTES)
}

/// `ppt/slides/slide1.xml` -> `ppt/slides/_rels/slide1.xml.rels`
pub(crate) fn rels_path_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part),
    }
}

/// Resolve a relationship target relative to the part that owns it
pub(crate) fn resolve_target(part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = match part.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').collect(),
        None => Vec::new(),
    };
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rels_path_for() {
        assert_eq!(
            rels_path_for("ppt/slides/slide3.xml"),
            "ppt/slides/_rels/slide3.xml.rels"
        );
        assert_eq!(
            rels_path_for("ppt/presentation.xml"),
            "ppt/_rels/presentation.xml.rels"
        );
    }

    #[test]
    fn test_declared_size_does_not_drive_allocation() {
        assert_eq!(capacity_hint(0), 0);
        assert_eq!(capacity_hint(4_096), 4_096);
        assert_eq!(capacity_hint(u64::MAX), MAX_PREALLOC_BYTES);
        assert_eq!(capacity_hint(MAX_PREALLOC_BYTES as u64 + 1), MAX_PREALLOC_BYTES);
    }

    #[test]
    fn test_resolve_target() {
        assert_eq!(
            resolve_target("ppt/slides/slide1.xml", "../media/image2.png"),
            "ppt/media/image2.png"
        );
        assert_eq!(
            resolve_target("ppt/presentation.xml", "slides/slide1.xml"),
            "ppt/slides/slide1.xml"
        );
        assert_eq!(
            resolve_target("ppt/slides/slide1.xml", "/ppt/media/a.png"),
            "ppt/media/a.png"
        );
        assert_eq!(
            resolve_target("ppt/slides/slide1.xml", "../notesSlides/./notesSlide1.xml"),
            "ppt/notesSlides/notesSlide1.xml"
        );
    }
}

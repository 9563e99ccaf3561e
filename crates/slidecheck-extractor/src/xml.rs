//! Event-based parsing of the PresentationML parts we care about
//!
//! Only `a:t` runs contribute text. Everything else (run properties,
//! geometry, indentation whitespace) is skipped.

use crate::error::ExtractionError;
use crate::text::{clean_text, collapse_whitespace};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use slidecheck_domain::TableGrid;

/// A relationship entry from a `.rels` part
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    pub external: bool,
}

impl Relationship {
    /// Relationship type without its namespace URI, e.g. `slide` or `image`
    pub fn kind(&self) -> &str {
        self.rel_type.rsplit('/').next().unwrap_or("")
    }
}

/// Shapes of one slide, before OCR
#[derive(Debug, Default, PartialEq)]
pub(crate) struct ParsedSlide {
    pub title: Option<String>,
    pub text_blocks: Vec<String>,
    pub tables: Vec<TableGrid>,
    /// `r:embed` ids of pictures, in document order
    pub image_refs: Vec<String>,
}

fn xml_error(part: &str, err: impl std::fmt::Display) -> ExtractionError {
    ExtractionError::Xml {
        part: part.to_string(),
        message: err.to_string(),
    }
}

fn attr(e: &BytesStart<'_>, name: &str, part: &str) -> Result<Option<String>, ExtractionError> {
    match e.try_get_attribute(name).map_err(|err| xml_error(part, err))? {
        Some(a) => Ok(Some(
            a.unescape_value()
                .map_err(|err| xml_error(part, err))?
                .into_owned(),
        )),
        None => Ok(None),
    }
}

/// Parse a `_rels/*.rels` part
pub(crate) fn parse_relationships(
    xml: &str,
    part: &str,
) -> Result<Vec<Relationship>, ExtractionError> {
    let mut reader = Reader::from_str(xml);
    let mut rels = Vec::new();

    loop {
        match reader.read_event().map_err(|e| xml_error(part, e))? {
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"Relationship" => {
                let id = attr(&e, "Id", part)?.unwrap_or_default();
                let rel_type = attr(&e, "Type", part)?.unwrap_or_default();
                let target = attr(&e, "Target", part)?.unwrap_or_default();
                let external = attr(&e, "TargetMode", part)?.as_deref() == Some("External");
                rels.push(Relationship {
                    id,
                    rel_type,
                    target,
                    external,
                });
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(rels)
}

/// Relationship ids of `p:sldId` entries in `ppt/presentation.xml`, in order
pub(crate) fn parse_slide_id_list(xml: &str, part: &str) -> Result<Vec<String>, ExtractionError> {
    let mut reader = Reader::from_str(xml);
    let mut ids = Vec::new();

    loop {
        match reader.read_event().map_err(|e| xml_error(part, e))? {
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"p:sldId" => {
                if let Some(id) = attr(&e, "r:id", part)? {
                    ids.push(id);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(ids)
}

#[derive(Default)]
struct ShapeState {
    placeholder: Option<String>,
    paragraphs: Vec<String>,
}

#[derive(Default)]
struct TableState {
    rows: Vec<Vec<String>>,
    row: Vec<String>,
    cell: Vec<String>,
}

/// Parse a slide part into title, text blocks, tables and picture refs
pub(crate) fn parse_slide(xml: &str, part: &str) -> Result<ParsedSlide, ExtractionError> {
    let mut reader = Reader::from_str(xml);
    let mut slide = ParsedSlide::default();

    let mut shape: Option<ShapeState> = None;
    let mut table: Option<TableState> = None;
    let mut pic_depth = 0usize;
    let mut paragraph = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event().map_err(|e| xml_error(part, e))? {
            Event::Start(e) => match e.name().as_ref() {
                b"p:sp" => shape = Some(ShapeState::default()),
                b"p:pic" => pic_depth += 1,
                b"a:tbl" => table = Some(TableState::default()),
                b"a:tr" => {
                    if let Some(t) = table.as_mut() {
                        t.row.clear();
                    }
                }
                b"a:tc" => {
                    if let Some(t) = table.as_mut() {
                        t.cell.clear();
                    }
                }
                b"a:p" => paragraph.clear(),
                b"a:t" => in_text = true,
                b"p:ph" => set_placeholder(&mut shape, &e, part)?,
                b"a:blip" if pic_depth > 0 => push_image_ref(&mut slide, &e, part)?,
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"p:ph" => set_placeholder(&mut shape, &e, part)?,
                b"a:blip" if pic_depth > 0 => push_image_ref(&mut slide, &e, part)?,
                b"a:br" => paragraph.push('\n'),
                // <a:tc/> is a cell with no text body
                b"a:tc" => {
                    if let Some(t) = table.as_mut() {
                        t.row.push(String::new());
                    }
                }
                _ => {}
            },
            Event::Text(t) if in_text => {
                let text = t.unescape().map_err(|e| xml_error(part, e))?;
                paragraph.push_str(&text);
            }
            Event::CData(t) if in_text => {
                paragraph.push_str(&String::from_utf8_lossy(&t.into_inner()));
            }
            Event::End(e) => match e.name().as_ref() {
                b"a:t" => in_text = false,
                b"a:p" => {
                    let text = std::mem::take(&mut paragraph);
                    if let Some(t) = table.as_mut() {
                        t.cell.push(text);
                    } else if let Some(s) = shape.as_mut() {
                        s.paragraphs.push(text);
                    }
                }
                b"a:tc" => {
                    if let Some(t) = table.as_mut() {
                        let cell = collapse_whitespace(&t.cell.join(" "));
                        t.cell.clear();
                        t.row.push(cell);
                    }
                }
                b"a:tr" => {
                    if let Some(t) = table.as_mut() {
                        let row = std::mem::take(&mut t.row);
                        t.rows.push(row);
                    }
                }
                b"a:tbl" => {
                    if let Some(t) = table.take() {
                        slide.tables.push(TableGrid::new(t.rows));
                    }
                }
                b"p:pic" => pic_depth = pic_depth.saturating_sub(1),
                b"p:sp" => {
                    if let Some(s) = shape.take() {
                        finish_shape(&mut slide, s);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(slide)
}

fn set_placeholder(
    shape: &mut Option<ShapeState>,
    e: &BytesStart<'_>,
    part: &str,
) -> Result<(), ExtractionError> {
    if let Some(s) = shape.as_mut() {
        // A placeholder without a type is a body placeholder
        s.placeholder = Some(attr(e, "type", part)?.unwrap_or_else(|| "body".to_string()));
    }
    Ok(())
}

fn push_image_ref(
    slide: &mut ParsedSlide,
    e: &BytesStart<'_>,
    part: &str,
) -> Result<(), ExtractionError> {
    if let Some(id) = attr(e, "r:embed", part)? {
        slide.image_refs.push(id);
    }
    Ok(())
}

fn finish_shape(slide: &mut ParsedSlide, shape: ShapeState) {
    // Footer furniture repeats on every slide and carries no content
    if matches!(shape.placeholder.as_deref(), Some("sldNum" | "dt" | "ftr")) {
        return;
    }

    let text = clean_text(&shape.paragraphs.join("\n"));
    if text.is_empty() {
        return;
    }

    let is_title = matches!(shape.placeholder.as_deref(), Some("title" | "ctrTitle"));
    if is_title && slide.title.is_none() {
        slide.title = Some(text.replace('\n', " "));
    } else {
        slide.text_blocks.push(text);
    }
}

/// Speaker notes text from a notes slide part
///
/// Only the body placeholder holds the notes; the slide thumbnail and
/// slide number placeholders are ignored.
pub(crate) fn parse_notes(xml: &str, part: &str) -> Result<Option<String>, ExtractionError> {
    let mut reader = Reader::from_str(xml);
    let mut shape: Option<ShapeState> = None;
    let mut paragraph = String::new();
    let mut in_text = false;
    let mut notes: Vec<String> = Vec::new();

    loop {
        match reader.read_event().map_err(|e| xml_error(part, e))? {
            Event::Start(e) => match e.name().as_ref() {
                b"p:sp" => shape = Some(ShapeState::default()),
                b"a:p" => paragraph.clear(),
                b"a:t" => in_text = true,
                b"p:ph" => set_placeholder(&mut shape, &e, part)?,
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"p:ph" => set_placeholder(&mut shape, &e, part)?,
                b"a:br" => paragraph.push('\n'),
                _ => {}
            },
            Event::Text(t) if in_text => {
                let text = t.unescape().map_err(|e| xml_error(part, e))?;
                paragraph.push_str(&text);
            }
            Event::End(e) => match e.name().as_ref() {
                b"a:t" => in_text = false,
                b"a:p" => {
                    if let Some(s) = shape.as_mut() {
                        s.paragraphs.push(std::mem::take(&mut paragraph));
                    }
                }
                b"p:sp" => {
                    if let Some(s) = shape.take() {
                        if s.placeholder.as_deref() == Some("body") {
                            let text = clean_text(&s.paragraphs.join("\n"));
                            if !text.is_empty() {
                                notes.push(text);
                            }
                        }
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(if notes.is_empty() {
        None
    } else {
        Some(notes.join("\n"))
    })
}

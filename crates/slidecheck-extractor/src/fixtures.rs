//! In-memory `.pptx` builder for tests
//!
//! Produces the minimal set of parts a real deck carries: content types,
//! presentation part with its slide list, slides, slide relationships,
//! notes slides and media.

use std::io::{Cursor, Write};
use std::path::Path;
use zip::result::ZipResult;
use zip::write::FileOptions;
use zip::ZipWriter;

const NS: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

/// Content of one fixture slide
#[derive(Debug, Clone, Default)]
pub struct FixtureSlide {
    title: Option<String>,
    texts: Vec<String>,
    tables: Vec<Vec<Vec<String>>>,
    notes: Option<String>,
    images: Vec<(String, Vec<u8>)>,
}

impl FixtureSlide {
    /// Empty slide
    pub fn new() -> Self {
        Self::default()
    }

    /// Title placeholder text
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Body text box; `\n` separates paragraphs
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.texts.push(text.into());
        self
    }

    /// Table given as rows of cells
    pub fn table<S: Into<String>>(mut self, rows: Vec<Vec<S>>) -> Self {
        self.tables.push(
            rows.into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        );
        self
    }

    /// Speaker notes
    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Picture backed by `ppt/media/<name>`
    pub fn image(mut self, name: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.images.push((name.into(), bytes));
        self
    }
}

/// Builds a `.pptx` container in memory
#[derive(Debug, Clone, Default)]
pub struct PptxBuilder {
    slides: Vec<FixtureSlide>,
    reverse_part_names: bool,
    omit_slide_list: bool,
    omitted_parts: Vec<String>,
}

impl PptxBuilder {
    /// Deck with no slides
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a slide
    pub fn slide(mut self, slide: FixtureSlide) -> Self {
        self.slides.push(slide);
        self
    }

    /// Name slide parts in reverse, so the last slide lives in `slide1.xml`
    pub fn reverse_part_names(mut self) -> Self {
        self.reverse_part_names = true;
        self
    }

    /// Leave `p:sldIdLst` out of the presentation part
    pub fn omit_slide_list(mut self) -> Self {
        self.omit_slide_list = true;
        self
    }

    /// Leave a part out of the archive while keeping every reference to it
    pub fn omit_part(mut self, name: impl Into<String>) -> Self {
        self.omitted_parts.push(name.into());
        self
    }

    /// Serialize the deck
    pub fn build(&self) -> ZipResult<Vec<u8>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default();
        let count = self.slides.len();
        let part_number = |i: usize| if self.reverse_part_names { count - i } else { i + 1 };

        let put = |zip: &mut ZipWriter<Cursor<Vec<u8>>>, name: &str, data: &[u8]| -> ZipResult<()> {
            if self.omitted_parts.iter().any(|p| p == name) {
                return Ok(());
            }
            zip.start_file(name, options)?;
            zip.write_all(data)?;
            Ok(())
        };

        put(&mut zip, "[Content_Types].xml", self.content_types(&part_number).as_bytes())?;
        put(
            &mut zip,
            "_rels/.rels",
            format!(
                r#"{}<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="{}/officeDocument" Target="ppt/presentation.xml"/></Relationships>"#,
                XML_DECL, REL_NS
            )
            .as_bytes(),
        )?;

        let mut pres_rels = String::new();
        let mut slide_ids = String::new();
        for i in 0..count {
            let n = part_number(i);
            pres_rels.push_str(&format!(
                r#"<Relationship Id="rId{}" Type="{}/slide" Target="slides/slide{}.xml"/>"#,
                i + 2,
                REL_NS,
                n
            ));
            slide_ids.push_str(&format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 256 + i, i + 2));
        }
        let slide_list = if self.omit_slide_list {
            String::new()
        } else {
            format!("<p:sldIdLst>{}</p:sldIdLst>", slide_ids)
        };
        put(
            &mut zip,
            "ppt/presentation.xml",
            format!(
                r#"{}<p:presentation {}>{}<p:sldSz cx="12192000" cy="6858000"/></p:presentation>"#,
                XML_DECL, NS, slide_list
            )
            .as_bytes(),
        )?;
        put(
            &mut zip,
            "ppt/_rels/presentation.xml.rels",
            format!(
                r#"{}<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{}</Relationships>"#,
                XML_DECL, pres_rels
            )
            .as_bytes(),
        )?;

        for (i, slide) in self.slides.iter().enumerate() {
            let n = part_number(i);
            let (xml, rels) = slide_parts(slide, n);
            put(&mut zip, &format!("ppt/slides/slide{}.xml", n), xml.as_bytes())?;
            if !rels.is_empty() {
                put(
                    &mut zip,
                    &format!("ppt/slides/_rels/slide{}.xml.rels", n),
                    format!(
                        r#"{}<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{}</Relationships>"#,
                        XML_DECL, rels
                    )
                    .as_bytes(),
                )?;
            }
            if let Some(notes) = &slide.notes {
                put(
                    &mut zip,
                    &format!("ppt/notesSlides/notesSlide{}.xml", n),
                    notes_xml(notes).as_bytes(),
                )?;
            }
            for (name, bytes) in &slide.images {
                put(&mut zip, &format!("ppt/media/{}", name), bytes)?;
            }
        }

        Ok(zip.finish()?.into_inner())
    }

    /// Serialize the deck to `path`
    pub fn write_to(&self, path: &Path) -> ZipResult<()> {
        let bytes = self.build()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    fn content_types(&self, part_number: &dyn Fn(usize) -> usize) -> String {
        let mut overrides = String::from(
            r#"<Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/>"#,
        );
        for i in 0..self.slides.len() {
            overrides.push_str(&format!(
                r#"<Override PartName="/ppt/slides/slide{}.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/>"#,
                part_number(i)
            ));
        }
        format!(
            r#"{}<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Default Extension="png" ContentType="image/png"/><Default Extension="jpeg" ContentType="image/jpeg"/>{}</Types>"#,
            XML_DECL, overrides
        )
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn paragraphs(text: &str) -> String {
    text.split('\n')
        .map(|line| {
            format!(
                "<a:p><a:r><a:rPr lang=\"en-US\"/><a:t>{}</a:t></a:r></a:p>",
                escape(line)
            )
        })
        .collect()
}

fn text_shape(id: usize, placeholder: &str, text: &str) -> String {
    format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="Shape {id}"/><p:cNvSpPr/><p:nvPr>{placeholder}</p:nvPr></p:nvSpPr><p:spPr/><p:txBody><a:bodyPr/><a:lstStyle/>{body}</p:txBody></p:sp>"#,
        id = id,
        placeholder = placeholder,
        body = paragraphs(text)
    )
}

fn table_frame(id: usize, rows: &[Vec<String>]) -> String {
    let mut xml = format!(
        r#"<p:graphicFrame><p:nvGraphicFramePr><p:cNvPr id="{}" name="Table {}"/><p:cNvGraphicFramePr/><p:nvPr/></p:nvGraphicFramePr><a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/table"><a:tbl><a:tblPr/>"#,
        id, id
    );
    for row in rows {
        xml.push_str(r#"<a:tr h="370840">"#);
        for cell in row {
            if cell.is_empty() {
                xml.push_str("<a:tc><a:txBody><a:bodyPr/><a:lstStyle/><a:p/></a:txBody><a:tcPr/></a:tc>");
            } else {
                xml.push_str(&format!(
                    "<a:tc><a:txBody><a:bodyPr/><a:lstStyle/>{}</a:txBody><a:tcPr/></a:tc>",
                    paragraphs(cell)
                ));
            }
        }
        xml.push_str("</a:tr>");
    }
    xml.push_str("</a:tbl></a:graphicData></a:graphic></p:graphicFrame>");
    xml
}

fn picture(id: usize, rel_id: &str) -> String {
    format!(
        r#"<p:pic><p:nvPicPr><p:cNvPr id="{id}" name="Picture {id}"/><p:cNvPicPr/><p:nvPr/></p:nvPicPr><p:blipFill><a:blip r:embed="{rel}"/><a:stretch><a:fillRect/></a:stretch></p:blipFill><p:spPr/></p:pic>"#,
        id = id,
        rel = rel_id
    )
}

/// Slide XML and the inner `Relationship` elements of its `.rels` part
fn slide_parts(slide: &FixtureSlide, n: usize) -> (String, String) {
    let mut shapes = String::new();
    let mut rels = String::new();
    let mut id = 2;

    if let Some(title) = &slide.title {
        shapes.push_str(&text_shape(id, r#"<p:ph type="title"/>"#, title));
        id += 1;
    }
    for text in &slide.texts {
        shapes.push_str(&text_shape(id, r#"<p:ph idx="1"/>"#, text));
        id += 1;
    }
    for table in &slide.tables {
        shapes.push_str(&table_frame(id, table));
        id += 1;
    }
    for (i, (name, _)) in slide.images.iter().enumerate() {
        let rel_id = format!("rId{}", i + 10);
        shapes.push_str(&picture(id, &rel_id));
        rels.push_str(&format!(
            r#"<Relationship Id="{}" Type="{}/image" Target="../media/{}"/>"#,
            rel_id, REL_NS, name
        ));
        id += 1;
    }
    if slide.notes.is_some() {
        rels.push_str(&format!(
            r#"<Relationship Id="rId2" Type="{}/notesSlide" Target="../notesSlides/notesSlide{}.xml"/>"#,
            REL_NS, n
        ));
    }

    let xml = format!(
        r#"{}<p:sld {}><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{}</p:spTree></p:cSld></p:sld>"#,
        XML_DECL, NS, shapes
    );
    (xml, rels)
}

fn notes_xml(notes: &str) -> String {
    format!(
        r#"{}<p:notes {}><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/><p:sp><p:nvSpPr><p:cNvPr id="2" name="Slide Image"/><p:cNvSpPr/><p:nvPr><p:ph type="sldImg"/></p:nvPr></p:nvSpPr><p:spPr/></p:sp>{}</p:spTree></p:cSld></p:notes>"#,
        XML_DECL,
        NS,
        text_shape(3, r#"<p:ph type="body" idx="1"/>"#, notes)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_produces_zip() {
        let bytes = PptxBuilder::new()
            .slide(FixtureSlide::new().title("A <&> B"))
            .build()
            .unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert!(archive.by_name("ppt/presentation.xml").is_ok());
        assert!(archive.by_name("ppt/slides/slide1.xml").is_ok());
        assert!(archive.by_name("ppt/slides/_rels/slide1.xml.rels").is_err());
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape(r#"a<b>&"c""#), "a&lt;b&gt;&amp;&quot;c&quot;");
    }
}

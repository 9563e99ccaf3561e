//! Slide records - the normalized output of content extraction

/// A table extracted from a slide.
///
/// The grid keeps the row/column structure of the source table. Empty cells
/// are stored as empty strings so that column positions stay meaningful.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableGrid {
    /// Rows of cells, top to bottom
    pub rows: Vec<Vec<String>>,
}

impl TableGrid {
    /// Create a table from its rows
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    /// Number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Widest row in the table (tables with merged cells can be ragged)
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Get a single cell, if it exists
    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .map(String::as_str)
    }

    /// True when the table has no rows or every cell is blank
    pub fn is_blank(&self) -> bool {
        self.rows
            .iter()
            .all(|row| row.iter().all(|cell| cell.trim().is_empty()))
    }

    /// Render the table as pipe-separated lines, one per row
    ///
    /// # Examples
    ///
    /// ```
    /// use slidecheck_domain::TableGrid;
    ///
    /// let table = TableGrid::new(vec![
    ///     vec!["Region".to_string(), "Share".to_string()],
    ///     vec!["EMEA".to_string(), String::new()],
    /// ]);
    /// assert_eq!(table.to_text(), "Region | Share\nEMEA | ");
    /// ```
    pub fn to_text(&self) -> String {
        self.rows
            .iter()
            .map(|row| row.join(" | "))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Normalized content of a single slide
///
/// Built once by the content extractor and treated as immutable afterwards:
/// batches and prompts only ever read it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SlideRecord {
    /// 1-based position of the slide in the deck
    pub index: usize,

    /// Title placeholder text, if the slide has one
    pub title: Option<String>,

    /// Text of every non-title text shape, in document order
    pub text_blocks: Vec<String>,

    /// Tables on the slide, in document order (empty when there are none)
    pub tables: Vec<TableGrid>,

    /// Speaker notes
    pub notes: Option<String>,

    /// Text recognized in the slide's images, one entry per image
    pub image_text: Vec<String>,
}

impl SlideRecord {
    /// Create an empty record for the slide at `index` (1-based)
    pub fn new(index: usize) -> Self {
        Self {
            index,
            ..Default::default()
        }
    }

    /// Set the title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Append a text block
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text_blocks.push(text.into());
        self
    }

    /// Append a table
    pub fn with_table(mut self, table: TableGrid) -> Self {
        self.tables.push(table);
        self
    }

    /// Set the speaker notes
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Append OCR text for one image
    pub fn with_image_text(mut self, text: impl Into<String>) -> Self {
        self.image_text.push(text.into());
        self
    }

    /// True when the slide carries no analysable content at all
    pub fn is_empty(&self) -> bool {
        self.title.as_deref().map_or(true, |t| t.trim().is_empty())
            && self.text_blocks.iter().all(|t| t.trim().is_empty())
            && self.tables.iter().all(TableGrid::is_blank)
            && self.notes.as_deref().map_or(true, |n| n.trim().is_empty())
            && self.image_text.iter().all(|t| t.trim().is_empty())
    }
}

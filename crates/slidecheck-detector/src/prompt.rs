//! Prompt construction for the detectors

use crate::config::DetectorThresholds;
use slidecheck_domain::{Batch, DetectorKind, SlideRecord};

/// Builds the request sent to the inference service for one (batch, kind) pair
pub struct PromptBuilder<'a> {
    kind: DetectorKind,
    batch: &'a Batch,
    thresholds: &'a DetectorThresholds,
}

impl<'a> PromptBuilder<'a> {
    /// Create a new prompt builder
    pub fn new(kind: DetectorKind, batch: &'a Batch, thresholds: &'a DetectorThresholds) -> Self {
        Self {
            kind,
            batch,
            thresholds,
        }
    }

    /// Build the complete detector prompt
    pub fn build(&self) -> String {
        let mut prompt = String::new();

        // 1. Shared instructions
        prompt.push_str(INSTRUCTIONS);
        prompt.push_str("\n\n");

        // 2. Detector-specific task
        prompt.push_str(&format!("Detector: {}\n", self.kind.as_str()));
        prompt.push_str(&self.task());
        prompt.push_str("\n\n");

        // 3. The slides
        prompt.push_str(&format!("Slides in this batch: {}\n", self.batch.slide_range()));
        prompt.push_str("---\n");
        for slide in &self.batch.slides {
            render_slide(&mut prompt, slide);
        }
        prompt.push_str("---\n\n");

        // 4. Output format reminder
        prompt.push_str(OUTPUT_FORMAT_REMINDER);

        prompt
    }

    fn task(&self) -> String {
        let t = self.thresholds;
        match self.kind {
            DetectorKind::Numerical => format!(
                "Find the same business metric stated with different values on different slides \
                 (revenue, costs, savings, time saved, user counts, market size).\n\
                 - Treat values as equal when they differ by less than {}%.\n\
                 - Normalise units and suffixes first: \"$2M\", \"$2,000,000\" and \"2 million dollars\" agree.\n\
                 - Different metrics are not conflicts (\"time per slide\" vs \"time per month\").\n\
                 - Ignore years, version numbers, slide numbers and other identifiers.",
                t.tolerance_pct
            ),
            DetectorKind::Percentage => format!(
                "Find percentage breakdowns that cannot be right.\n\
                 - Percentages describing parts of one whole (market share, budget allocation, \
                 composition, time distribution) must sum to 100%, within {} percentage points.\n\
                 - A part-of-a-whole percentage above 100% is an error.\n\
                 - Growth rates, returns and comparisons to a baseline may exceed 100% and are not \
                 grouped with breakdowns.\n\
                 - The same percentage metric stated with different values on different slides is \
                 also an inconsistency.",
                t.total_tolerance_pp
            ),
            DetectorKind::Textual => format!(
                "Find claims that contradict each other.\n\
                 - Two claims contradict when they make opposing assertions about the same \
                 business aspect, market or capability, or state mutually exclusive facts.\n\
                 - They do not contradict when they cover different aspects, markets or time \
                 periods, or describe change over time.\n\
                 - Only report pairs about the same subject with a similarity of at least {} on a \
                 0 to 1 scale.\n\
                 - Example: \"few competitors\" vs \"highly competitive market\" contradict; \
                 \"growing costs\" vs \"increasing revenue\" do not.",
                t.similarity_threshold
            ),
            DetectorKind::Timeline => format!(
                "Find dates, durations and sequences that disagree.\n\
                 - The same event or milestone given different dates or quarters.\n\
                 - Phases whose stated order or duration is impossible (an end before its start, \
                 a later phase starting before an earlier one).\n\
                 - Periods may overlap by up to {} day(s) before it counts as a conflict.\n\
                 - Past and future states of the same plan are not conflicts.",
                t.overlap_tolerance_days
            ),
        }
    }
}

fn render_slide(prompt: &mut String, slide: &SlideRecord) {
    prompt.push_str(&format!("Slide {}\n", slide.index));

    if let Some(title) = slide.title.as_deref().filter(|t| !t.trim().is_empty()) {
        prompt.push_str(&format!("Title: {}\n", title));
    }
    for block in slide.text_blocks.iter().filter(|b| !b.trim().is_empty()) {
        prompt.push_str(&format!("Text: {}\n", block));
    }
    for table in slide.tables.iter().filter(|t| !t.is_blank()) {
        prompt.push_str(&format!(
            "Table ({} rows x {} columns):\n",
            table.row_count(),
            table.column_count()
        ));
        prompt.push_str(&table.to_text());
        prompt.push('\n');
    }
    for text in slide.image_text.iter().filter(|t| !t.trim().is_empty()) {
        prompt.push_str(&format!("Image text: {}\n", text));
    }
    if let Some(notes) = slide.notes.as_deref().filter(|n| !n.trim().is_empty()) {
        prompt.push_str(&format!("Speaker notes: {}\n", notes));
    }
    prompt.push('\n');
}

const INSTRUCTIONS: &str = r#"You review presentation decks for factual inconsistencies.
Below is the extracted content of several slides. Report every inconsistency of the
requested kind, either between slides or within a single slide.

Rules:
- Only use the slide content shown; do not guess at missing data
- Refer to slides by the numbers given after "Slide"
- One finding per distinct inconsistency; list every slide involved
- Describe the conflict in one sentence, quoting the conflicting values
- Confidence reflects how sure you are that this is a real inconsistency:
  - Possible but ambiguous: 0.3-0.5
  - Likely: 0.6-0.79
  - Clear contradiction of explicit values: 0.8-1.0
- If nothing is inconsistent, return an empty array"#;

const OUTPUT_FORMAT_REMINDER: &str = r#"Output format (JSON array only, no additional text):
[
  {
    "slides": [2, 7],
    "description": "one-sentence summary of the inconsistency",
    "details": "optional longer explanation",
    "confidence": 0.0-1.0
  }
]

Remember: Return ONLY valid JSON, no markdown code blocks, no explanations."#;

#[cfg(test)]
mod tests {
    use super::*;
    use slidecheck_domain::{BatchId, TableGrid};

    fn batch() -> Batch {
        Batch::new(
            BatchId(0),
            vec![
                SlideRecord::new(2)
                    .with_title("Financials")
                    .with_text("Revenue: $5M")
                    .with_notes("Audited figures"),
                SlideRecord::new(3)
                    .with_table(TableGrid::new(vec![
                        vec!["Region".into(), "Share".into()],
                        vec!["EU".into(), "".into()],
                    ]))
                    .with_image_text("Chart: 40% / 60%"),
            ],
        )
    }

    #[test]
    fn test_prompt_names_detector() {
        let batch = batch();
        let thresholds = DetectorThresholds::default();
        for kind in DetectorKind::ALL {
            let prompt = PromptBuilder::new(kind, &batch, &thresholds).build();
            assert!(prompt.contains(&format!("Detector: {}", kind.as_str())));
        }
    }

    #[test]
    fn test_prompt_renders_all_content() {
        let batch = batch();
        let thresholds = DetectorThresholds::default();
        let prompt = PromptBuilder::new(DetectorKind::Numerical, &batch, &thresholds).build();

        assert!(prompt.contains("Slide 2\n"));
        assert!(prompt.contains("Title: Financials"));
        assert!(prompt.contains("Text: Revenue: $5M"));
        assert!(prompt.contains("Speaker notes: Audited figures"));
        assert!(prompt.contains("Table (2 rows x 2 columns):\nRegion | Share\nEU | \n"));
        assert!(prompt.contains("Image text: Chart: 40% / 60%"));
        assert!(prompt.ends_with("no explanations."));
    }

    #[test]
    fn test_prompt_embeds_thresholds() {
        let batch = batch();
        let thresholds = DetectorThresholds {
            tolerance_pct: 2.5,
            similarity_threshold: 0.9,
            total_tolerance_pp: 3.0,
            overlap_tolerance_days: 7,
            ..Default::default()
        };

        let numerical = PromptBuilder::new(DetectorKind::Numerical, &batch, &thresholds).build();
        assert!(numerical.contains("less than 2.5%"));

        let percentage = PromptBuilder::new(DetectorKind::Percentage, &batch, &thresholds).build();
        assert!(percentage.contains("within 3 percentage points"));

        let textual = PromptBuilder::new(DetectorKind::Textual, &batch, &thresholds).build();
        assert!(textual.contains("at least 0.9"));

        let timeline = PromptBuilder::new(DetectorKind::Timeline, &batch, &thresholds).build();
        assert!(timeline.contains("up to 7 day(s)"));
    }
}

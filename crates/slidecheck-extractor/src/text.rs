//! Text cleanup applied to every extracted string

const BULLETS: [char; 5] = ['\u{2022}', '\u{2023}', '\u{25E6}', '\u{2043}', '\u{2219}'];

/// Clean extracted text line by line
///
/// Whitespace runs collapse to one space, bullet glyphs become `"• "`, and
/// lines that are empty or contain only punctuation are dropped.
///
/// # Examples
///
/// ```
/// use slidecheck_extractor::clean_text;
///
/// assert_eq!(clean_text("  Revenue:\t$5M \n\n---\n\u{25E6}  Growth 12%"), "Revenue: $5M\n• Growth 12%");
/// ```
pub fn clean_text(text: &str) -> String {
    text.lines()
        .filter_map(clean_line)
        .collect::<Vec<_>>()
        .join("\n")
}

fn clean_line(line: &str) -> Option<String> {
    let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() || !collapsed.chars().any(char::is_alphanumeric) {
        return None;
    }

    let body = collapsed.trim_start_matches(|c| BULLETS.contains(&c));
    if body.len() != collapsed.len() {
        return Some(format!("\u{2022} {}", body.trim_start()));
    }

    // ASCII bullets only count when followed by a space, so "-5%" survives
    for marker in ["- ", "* "] {
        if let Some(rest) = collapsed.strip_prefix(marker) {
            return Some(format!("\u{2022} {}", rest));
        }
    }

    Some(collapsed)
}

/// Collapse all whitespace, including newlines, to single spaces
pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapses_whitespace() {
        assert_eq!(clean_text("Total   market\u{a0} share"), "Total market share");
    }

    #[test]
    fn test_drops_punctuation_only_lines() {
        assert_eq!(clean_text("...\n***\nKeep me"), "Keep me");
        assert_eq!(clean_text("   "), "");
    }

    #[test]
    fn test_keeps_numbers() {
        assert_eq!(clean_text("2024"), "2024");
        assert_eq!(clean_text("-5% churn"), "-5% churn");
    }

    #[test]
    fn test_normalizes_bullets() {
        assert_eq!(clean_text("\u{2022}\u{2022} First"), "\u{2022} First");
        assert_eq!(clean_text("- Second"), "\u{2022} Second");
        assert_eq!(clean_text("* Third"), "\u{2022} Third");
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace(" a\n b\tc "), "a b c");
    }
}

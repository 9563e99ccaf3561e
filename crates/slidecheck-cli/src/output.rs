//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use colored::*;
use serde_json::{json, Value};
use slidecheck_detector::Report;
use slidecheck_domain::{Finding, Severity};
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

const RULE_WIDTH: usize = 60;
const DETAILS_PREVIEW: usize = 100;

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Format an analysis report.
    pub fn format_report(&self, report: &Report) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&report_json(report))?),
            OutputFormat::Rich => Ok(self.format_rich(report)),
            OutputFormat::Simple => Ok(format_simple(report)),
        }
    }

    /// Format the report as a table.
    fn format_rich(&self, report: &Report) -> String {
        let mut out = Vec::new();

        if report.findings.is_empty() {
            out.push(self.success("No inconsistencies detected"));
            if report.is_clean() {
                out.push(format!(
                    "All {} slide(s) appear to be internally consistent.",
                    report.slide_count
                ));
            } else {
                out.push("Analysis finished with warnings; see below.".to_string());
            }
        } else {
            out.push(self.colorize("SlideCheck Inconsistency Report", "magenta"));

            let mut builder = Builder::default();
            builder.push_record([
                "#",
                "Severity",
                "Type",
                "Slides",
                "Description",
                "Details",
                "Confidence",
            ]);
            for (i, finding) in report.findings.iter().enumerate() {
                builder.push_record([
                    (i + 1).to_string(),
                    severity_label(finding.severity()).to_string(),
                    finding.kind().label().to_string(),
                    slide_list(finding),
                    finding.description().to_string(),
                    preview(finding.details().unwrap_or(""), DETAILS_PREVIEW),
                    percent(finding.confidence()),
                ]);
            }

            let mut table = builder.build();
            table
                .with(Style::rounded())
                .with(Modify::new(Rows::first()).with(Alignment::center()));
            out.push(table.to_string());

            out.push(format!(
                "Total issues found: {} ({}, {}, {})",
                report.findings.len(),
                self.colorize(
                    &format!("{} high", report.count_by_severity(Severity::High)),
                    "red"
                ),
                self.colorize(
                    &format!("{} medium", report.count_by_severity(Severity::Medium)),
                    "yellow"
                ),
                format!("{} low", report.count_by_severity(Severity::Low)),
            ));
        }

        if let Some(note) = batch_note(report) {
            out.push(String::new());
            out.push(note);
        }

        if !report.warnings.is_empty() {
            out.push(String::new());
            out.push(self.colorize("Warnings:", "yellow"));
            for warning in &report.warnings {
                out.push(self.warning(&warning.to_string()));
            }
        }

        out.join("\n")
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "yellow" => text.yellow().to_string(),
            "magenta" => text.magenta().bold().to_string(),
            _ => text.to_string(),
        }
    }
}

/// Structured form of a report.
///
/// Object keys serialize in sorted order and findings keep the report's
/// order, so identical reports produce identical JSON.
pub fn report_json(report: &Report) -> Value {
    let findings: Vec<Value> = report
        .findings
        .iter()
        .map(|f| {
            json!({
                "kind": f.kind().as_str(),
                "slides": f.slide_list(),
                "description": f.description(),
                "details": f.details(),
                "confidence": f.confidence(),
                "severity": f.severity().as_str(),
            })
        })
        .collect();

    let partial_failures: Vec<Value> = report
        .partial_failures
        .iter()
        .map(|p| {
            json!({
                "kind": p.kind.as_str(),
                "batch": p.batch.value(),
                "reason": p.reason,
                "attempts": p.attempts,
            })
        })
        .collect();

    let warnings: Vec<String> = report.warnings.iter().map(ToString::to_string).collect();

    json!({
        "findings": findings,
        "warnings": warnings,
        "partial_failures": partial_failures,
        "summary": {
            "slides": report.slide_count,
            "batches": report.batch_count,
            "findings": report.findings.len(),
            "partial_failures": report.partial_failures.len(),
        },
    })
}

/// Format the report as plain text.
fn format_simple(report: &Report) -> String {
    let mut out = Vec::new();

    if report.findings.is_empty() {
        out.push("No inconsistencies detected".to_string());
    } else {
        out.push("SlideCheck Inconsistency Report".to_string());
        out.push("=".repeat(RULE_WIDTH));

        for (i, finding) in report.findings.iter().enumerate() {
            out.push(String::new());
            out.push(format!("{}. {}", i + 1, finding.description()));
            out.push(format!("   Type: {}", finding.kind().label()));
            out.push(format!("   Severity: {}", severity_label(finding.severity())));
            out.push(format!("   Slides: {}", slide_list(finding)));
            out.push(format!("   Confidence: {}", percent(finding.confidence())));
            if let Some(details) = finding.details() {
                out.push(format!("   Details: {}", details));
            }
        }

        out.push(String::new());
        out.push(format!("Total issues found: {}", report.findings.len()));
    }

    if let Some(note) = batch_note(report) {
        out.push(String::new());
        out.push(note);
    }

    if !report.warnings.is_empty() {
        out.push(String::new());
        out.push("Warnings:".to_string());
        for warning in &report.warnings {
            out.push(format!("- {}", warning));
        }
    }

    out.join("\n")
}

/// Coverage caveat for decks that were split into several batches
fn batch_note(report: &Report) -> Option<String> {
    (report.batch_count > 1).then(|| {
        format!(
            "Note: slides were analysed in {} batches; inconsistencies between slides in \
             different batches are not detected.",
            report.batch_count
        )
    })
}

fn severity_label(severity: Severity) -> &'static str {
    match severity {
        Severity::High => "HIGH",
        Severity::Medium => "MEDIUM",
        Severity::Low => "LOW",
    }
}

fn slide_list(finding: &Finding) -> String {
    finding
        .slide_list()
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn percent(confidence: f64) -> String {
    format!("{:.1}%", confidence * 100.0)
}

fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}...", cut)
}

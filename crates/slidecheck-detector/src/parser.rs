//! Parse detector responses into findings

use crate::error::DetectorError;
use serde_json::Value;
use slidecheck_domain::{Batch, DetectorKind, Finding, SeverityThresholds, Warning};
use tracing::warn;

/// Findings accepted from one response, plus what had to be dropped
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedFindings {
    /// Valid findings
    pub findings: Vec<Finding>,
    /// Findings dropped because they referenced slides outside the batch
    pub warnings: Vec<Warning>,
}

/// Parse a detector response for `batch`
///
/// The response must be a JSON array of finding objects (or an object
/// holding one under `findings`, `issues` or `inconsistencies`). Any schema
/// violation fails the whole response; findings that are well-formed but
/// reference slides outside the batch are dropped with a warning.
pub fn parse_findings(
    response: &str,
    kind: DetectorKind,
    batch: &Batch,
    thresholds: &SeverityThresholds,
) -> Result<ParsedFindings, DetectorError> {
    let json_str = extract_json(response)?;
    let json: Value = serde_json::from_str(json_str)?;

    let items = findings_array(&json)?;

    let mut parsed = ParsedFindings::default();
    for (idx, item) in items.iter().enumerate() {
        let raw = parse_finding_json(item)
            .map_err(|e| DetectorError::InvalidResponse(format!("finding {}: {}", idx, e)))?;

        if let Some(stray) = raw.slides.iter().find(|s| !batch.contains_slide(**s)) {
            warn!(
                kind = kind.as_str(),
                batch = batch.id.value(),
                slide = *stray,
                "Dropping finding that references a slide outside its batch"
            );
            parsed.warnings.push(Warning::general(format!(
                "{} detector reported slide {} outside batch {} (slides {}); finding dropped: {}",
                kind,
                stray,
                batch.id,
                batch.slide_range(),
                raw.description
            )));
            continue;
        }

        let finding = Finding::new(
            kind,
            raw.slides,
            raw.description,
            raw.confidence,
            thresholds,
        )
        .map_err(|e| DetectorError::InvalidResponse(format!("finding {}: {}", idx, e)))?;
        let finding = match raw.details {
            Some(details) => finding.with_details(details),
            None => finding,
        };
        parsed.findings.push(finding);
    }

    Ok(parsed)
}

/// Extract JSON from response, handling markdown code blocks and surrounding prose
pub(crate) fn extract_json(response: &str) -> Result<&str, DetectorError> {
    let trimmed = response.trim();

    if trimmed.is_empty() {
        return Err(DetectorError::InvalidResponse("empty response".to_string()));
    }

    let body = if let Some(rest) = trimmed.strip_prefix("```") {
        // Skip the info string ("json") up to the first newline
        let rest = rest.split_once('\n').map_or("", |(_, body)| body);
        rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
    } else {
        trimmed
    };

    if body.starts_with('[') || body.starts_with('{') {
        return Ok(body);
    }

    // Prose around the payload: take the outermost bracketed span
    let start = body.find(['[', '{']);
    let end = body.rfind([']', '}']);
    match (start, end) {
        (Some(start), Some(end)) if start < end => Ok(&body[start..=end]),
        _ => Err(DetectorError::InvalidResponse(
            "no JSON found in response".to_string(),
        )),
    }
}

fn findings_array(json: &Value) -> Result<&Vec<Value>, DetectorError> {
    if let Some(items) = json.as_array() {
        return Ok(items);
    }
    json.as_object()
        .and_then(|obj| {
            ["findings", "issues", "inconsistencies"]
                .iter()
                .find_map(|key| obj.get(*key).and_then(Value::as_array))
        })
        .ok_or_else(|| DetectorError::InvalidResponse("Expected JSON array".to_string()))
}

struct RawFinding {
    slides: Vec<usize>,
    description: String,
    details: Option<String>,
    confidence: f64,
}

/// Parse a single finding from JSON
fn parse_finding_json(json: &Value) -> Result<RawFinding, String> {
    let obj = json
        .as_object()
        .ok_or_else(|| "Finding is not a JSON object".to_string())?;

    let slides = obj
        .get("slides")
        .and_then(Value::as_array)
        .ok_or_else(|| "Missing or invalid 'slides'".to_string())?
        .iter()
        .map(|v| {
            v.as_u64()
                .map(|n| n as usize)
                .ok_or_else(|| format!("Invalid slide number {}", v))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let description = obj
        .get("description")
        .and_then(Value::as_str)
        .ok_or_else(|| "Missing or invalid 'description'".to_string())?
        .to_string();

    let details = match obj.get("details") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => return Err("Invalid 'details'".to_string()),
    };

    let confidence = obj
        .get("confidence")
        .and_then(Value::as_f64)
        .ok_or_else(|| "Missing or invalid 'confidence'".to_string())?;

    Ok(RawFinding {
        slides,
        description,
        details,
        confidence,
    })
}

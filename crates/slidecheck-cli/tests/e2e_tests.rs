//! Whole-pipeline runs: a .pptx on disk through to the rendered report

use serde_json::Value;
use slidecheck_cli::commands::{analyze_presentation, Services};
use slidecheck_cli::config::OutputFormat;
use slidecheck_cli::{CliError, Config, Formatter};
use slidecheck_extractor::fixtures::{FixtureSlide, PptxBuilder};
use slidecheck_llm::{LlmError, MockOcr, MockProvider};
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn write_deck(dir: &Path) -> PathBuf {
    let builder = (1..=8).fold(PptxBuilder::new(), |builder, n| {
        let slide = match n {
            2 => FixtureSlide::new().title("Q3 Results").text("Revenue: $5M"),
            4 => FixtureSlide::new().title("Market Share").table(vec![
                vec!["Segment", "Share"],
                vec!["Enterprise", "40%"],
                vec!["SMB", "35%"],
                vec!["Consumer", "20%"],
            ]),
            5 => FixtureSlide::new()
                .title("Growth")
                .image("chart5.png", vec![0x89, 0x50, 0x4e, 0x47]),
            7 => FixtureSlide::new()
                .title("Summary")
                .text("Revenue: $8M")
                .notes("Numbers from the finance team"),
            n => FixtureSlide::new().title(format!("Section {}", n)),
        };
        builder.slide(slide)
    });

    let path = dir.join("deck.pptx");
    builder.write_to(&path).unwrap();
    path
}

fn test_config() -> Config {
    let mut config = Config::default();
    config.gemini.backoff_base_ms = 0;
    config.gemini.backoff_max_ms = 0;
    config
}

fn scripted_provider() -> MockProvider {
    let mut provider = MockProvider::default();
    provider.add_response(
        "Detector: numerical",
        r#"[{"slides": [7, 2], "description": "Revenue is $5M on slide 2 but $8M on slide 7", "confidence": 0.92}]"#,
    );
    provider.add_response(
        "Detector: percentage",
        r#"[{"slides": [4], "description": "Market shares sum to 95%", "details": "40 + 35 + 20", "confidence": 0.7}]"#,
    );
    provider
}

#[tokio::test]
async fn test_pipeline_produces_expected_json() {
    let dir = tempfile::tempdir().unwrap();
    let deck = write_deck(dir.path());
    let provider = Arc::new(scripted_provider());
    let services = Services {
        inference: provider.clone(),
        ocr: None,
    };

    let report = analyze_presentation(&deck, None, &test_config(), services)
        .await
        .unwrap();

    assert_eq!(report.slide_count, 8);
    assert_eq!(provider.call_count(), 4);
    assert!(provider.prompts()[0].contains("Speaker notes: Numbers from the finance team"));

    let output = Formatter::new(OutputFormat::Json, false)
        .format_report(&report)
        .unwrap();
    let value: Value = serde_json::from_str(&output).unwrap();

    let findings = value["findings"].as_array().unwrap();
    assert_eq!(findings.len(), 2);
    assert_eq!(findings[0]["kind"], "numerical");
    assert_eq!(findings[0]["slides"], serde_json::json!([2, 7]));
    assert_eq!(findings[0]["severity"], "high");
    assert_eq!(findings[1]["kind"], "percentage");
    assert_eq!(findings[1]["slides"], serde_json::json!([4]));
    assert_eq!(value["summary"]["partial_failures"], 0);
}

#[tokio::test]
async fn test_json_output_is_byte_identical_across_runs() {
    let dir = tempfile::tempdir().unwrap();
    let deck = write_deck(dir.path());
    let formatter = Formatter::new(OutputFormat::Json, false);

    let mut outputs = Vec::new();
    for _ in 0..2 {
        let services = Services {
            inference: Arc::new(scripted_provider()),
            ocr: None,
        };
        let report = analyze_presentation(&deck, None, &test_config(), services)
            .await
            .unwrap();
        outputs.push(formatter.format_report(&report).unwrap());
    }

    assert_eq!(outputs[0], outputs[1]);
}

#[tokio::test]
async fn test_ocr_failure_reported_as_warning() {
    let dir = tempfile::tempdir().unwrap();
    let deck = write_deck(dir.path());
    let mut ocr = MockOcr::default();
    ocr.add_failure("chart5.png", LlmError::Communication("connection reset".into()));
    let services = Services {
        inference: Arc::new(MockProvider::default()),
        ocr: Some(Arc::new(ocr)),
    };

    let report = analyze_presentation(&deck, None, &test_config(), services)
        .await
        .unwrap();

    assert!(report.findings.is_empty());
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].slide, Some(5));

    let simple = Formatter::new(OutputFormat::Simple, false)
        .format_report(&report)
        .unwrap();
    assert!(simple.starts_with("No inconsistencies detected"));
    assert!(simple.contains("- slide 5: OCR failed for image chart5.png"));
}

#[tokio::test]
async fn test_partial_failures_listed_with_findings() {
    let dir = tempfile::tempdir().unwrap();
    let deck = write_deck(dir.path());
    let mut provider = scripted_provider();
    provider.push_failures("Detector: textual", LlmError::RateLimitExceeded, 10);
    let services = Services {
        inference: Arc::new(provider),
        ocr: None,
    };

    let report = analyze_presentation(&deck, None, &test_config(), services)
        .await
        .unwrap();

    assert_eq!(report.findings.len(), 2);
    let value = slidecheck_cli::output::report_json(&report);
    assert_eq!(value["partial_failures"][0]["kind"], "textual");
    assert_eq!(value["partial_failures"][0]["batch"], 0);
    assert_eq!(value["partial_failures"][0]["attempts"], 3);
    assert_eq!(value["partial_failures"][0]["reason"], "Rate limit exceeded");
}

#[tokio::test]
async fn test_fatal_service_error_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let deck = write_deck(dir.path());
    let mut provider = MockProvider::default();
    provider.add_error("Detector:", LlmError::ModelNotAvailable("gemini-9".into()));
    let services = Services {
        inference: Arc::new(provider),
        ocr: None,
    };

    let err = analyze_presentation(&deck, None, &test_config(), services)
        .await
        .unwrap_err();

    assert!(matches!(err, CliError::Detection(_)));
    assert_eq!(err.exit_code(), 4);
}

#[tokio::test]
async fn test_wrong_extension_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, "Revenue: $5M").unwrap();
    let services = Services {
        inference: Arc::new(MockProvider::default()),
        ocr: None,
    };

    let err = analyze_presentation(&path, None, &test_config(), services)
        .await
        .unwrap_err();

    assert_eq!(err.exit_code(), 3);
}

#[tokio::test]
async fn test_enabled_detectors_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let deck = write_deck(dir.path());
    let config_path = dir.path().join("slidecheck.toml");
    std::fs::write(
        &config_path,
        "[detectors]\nenabled = [\"numerical\"]\n\n[gemini]\nbackoff_base_ms = 0\nbackoff_max_ms = 0\n",
    )
    .unwrap();
    let (config, _) = Config::load(Some(&config_path)).unwrap();
    let provider = Arc::new(scripted_provider());
    let services = Services {
        inference: provider.clone(),
        ocr: None,
    };

    let report = analyze_presentation(&deck, None, &config, services)
        .await
        .unwrap();

    assert_eq!(provider.call_count(), 1);
    assert_eq!(report.findings.len(), 1);
}

#[tokio::test]
async fn test_min_confidence_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let deck = write_deck(dir.path());
    let config_path = dir.path().join("slidecheck.toml");
    std::fs::write(
        &config_path,
        "[detectors]\nmin_confidence = 0.8\n\n[gemini]\nbackoff_base_ms = 0\nbackoff_max_ms = 0\n",
    )
    .unwrap();
    let (config, _) = Config::load(Some(&config_path)).unwrap();
    let services = Services {
        inference: Arc::new(scripted_provider()),
        ocr: None,
    };

    let report = analyze_presentation(&deck, None, &config, services)
        .await
        .unwrap();

    assert_eq!(report.findings.len(), 1);
    assert_eq!(report.findings[0].slide_list(), vec![2, 7]);
    assert!(report.warnings.is_empty());
}

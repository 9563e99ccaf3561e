//! Run command implementation.

use crate::cli::RunArgs;
use crate::config::Config;
use crate::error::Result;
use crate::output::Formatter;
use slidecheck_detector::{Analyzer, Report};
use slidecheck_extractor::{validate_input, ContentExtractor};
use slidecheck_llm::{GeminiProvider, InferenceService, OcrService};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Service handles shared by the whole run.
#[derive(Clone)]
pub struct Services {
    /// Detector backend
    pub inference: Arc<dyn InferenceService>,
    /// Image text backend; `None` disables OCR
    pub ocr: Option<Arc<dyn OcrService>>,
}

impl Services {
    /// Gemini for both detection and OCR.
    pub fn gemini(config: &Config) -> Result<Self> {
        let provider = GeminiProvider::from_env(
            &config.gemini.api_key_env,
            config.gemini.model.clone(),
            config.gemini.timeout_secs,
        )?
        .with_endpoint(config.gemini.endpoint.clone());
        let provider = Arc::new(provider);

        let ocr: Option<Arc<dyn OcrService>> = if config.ocr.enabled {
            Some(provider.clone() as Arc<dyn OcrService>)
        } else {
            None
        };
        Ok(Self {
            inference: provider,
            ocr,
        })
    }
}

/// Extract `file` and run the detectors over it.
pub async fn analyze_presentation(
    file: &Path,
    images: Option<&Path>,
    config: &Config,
    services: Services,
) -> Result<Report> {
    let mut extractor = ContentExtractor::new();
    if let Some(ocr) = services.ocr {
        extractor = extractor.with_ocr(ocr);
    }
    if let Some(dir) = images {
        extractor = extractor.with_image_dir(dir);
    }

    let extraction = extractor.extract(file).await?;
    info!(
        slides = extraction.slides.len(),
        model = services.inference.model_name(),
        "Analyzing presentation"
    );

    let analyzer = Analyzer::new(services.inference, config.detector_config())?;
    let report = analyzer
        .analyze(&extraction.slides, extraction.warnings)
        .await?;
    Ok(report)
}

/// Execute the run command.
pub async fn execute_run(args: &RunArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    // Input problems are reported before credentials are looked at
    validate_input(&args.file)?;

    let services = Services::gemini(config)?;
    let report =
        analyze_presentation(&args.file, args.images.as_deref(), config, services).await?;

    println!("{}", formatter.format_report(&report)?);
    Ok(())
}

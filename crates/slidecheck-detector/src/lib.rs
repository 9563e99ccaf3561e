//! SlideCheck Detector
//!
//! Finds inconsistencies across slides by asking an inference service to
//! review them, one batch and one detector kind at a time.
//!
//! # Architecture
//!
//! ```text
//! SlideRecords → Batcher → Dispatcher ─┬─ (batch 0, numerical) ─┐
//!                                       ├─ (batch 0, percentage) ├→ Aggregator → Report
//!                                       └─ ...                   ┘
//! ```
//!
//! # Key Features
//!
//! - **Bounded fan-out**: at most `max_concurrency` requests in flight
//! - **Pacing**: optional minimum gap between request starts, and a longer
//!   wait before retrying a rate-limited request
//! - **Retry with backoff**: transient failures are retried; exhaustion
//!   leaves a [`PartialFailure`](slidecheck_domain::PartialFailure) and the
//!   run carries on
//! - **Fail fast**: credential, request and model errors abort the run
//! - **Deterministic reports**: duplicates collapse, order is total
//!
//! # Example Usage
//!
//! ```no_run
//! use slidecheck_detector::{Analyzer, DetectorConfig};
//! use slidecheck_domain::SlideRecord;
//! use slidecheck_llm::MockProvider;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let analyzer = Analyzer::new(Arc::new(MockProvider::default()), DetectorConfig::default())?;
//!
//! let slides = vec![
//!     SlideRecord::new(1).with_text("Revenue: $5M"),
//!     SlideRecord::new(2).with_text("Revenue: $8M"),
//! ];
//! let report = analyzer.analyze(&slides, vec![]).await?;
//!
//! println!("{} findings", report.findings.len());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod aggregator;
mod analyzer;
mod batching;
mod config;
mod dispatcher;
mod error;
mod parser;
mod prompt;
mod retry;

pub use aggregator::{aggregate, dedup_and_sort, Report};
pub use analyzer::Analyzer;
pub use batching::Batcher;
pub use config::{DetectorConfig, DetectorThresholds};
pub use dispatcher::{DetectorRun, Dispatcher, RunOutcome};
pub use error::DetectorError;
pub use parser::{parse_findings, ParsedFindings};
pub use prompt::PromptBuilder;
pub use retry::{run_with_retry, AttemptState, RetryOutcome, RetryPolicy};

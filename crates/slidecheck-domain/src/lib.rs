//! SlideCheck Domain Layer
//!
//! Core value types shared by every other SlideCheck crate. Like the rest of
//! the domain layer this crate has ZERO external dependencies: it only
//! describes what a slide, a batch and a finding are, never how they are
//! extracted, dispatched or rendered.
//!
//! ## Key Concepts
//!
//! - **SlideRecord**: normalized content of one slide (text, tables, notes,
//!   OCR text), created once during extraction
//! - **Batch**: ordered group of slides sent together to the inference service
//! - **Finding**: one detected inconsistency with kind, slides, description
//!   and confidence
//! - **Severity**: bucket derived from a finding's confidence
//! - **PartialFailure**: a (batch, detector) pair that never succeeded
//!
//! ## Lifecycle
//!
//! Nothing in this crate is persisted. Records, batches and findings live for
//! exactly one analysis run.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod batch;
pub mod failure;
pub mod finding;
pub mod severity;
pub mod slide;

// Re-exports for convenience
pub use batch::{Batch, BatchId};
pub use failure::{PartialFailure, Warning};
pub use finding::{
    normalize_description, DetectorKind, Finding, FindingError, FindingKey, ParseKindError,
};
pub use severity::{Severity, SeverityThresholds};
pub use slide::{SlideRecord, TableGrid};

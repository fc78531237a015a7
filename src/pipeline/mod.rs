//! The two-stage extraction pipeline: classify first, extract second.
//!
//! Classification sees only the list of type names; extraction sees only
//! the chosen type's schema. This keeps prompt size bounded and prevents
//! cross-type field leakage as the registry grows.

pub mod classify;
pub mod extract;
pub mod orchestrator;

pub use classify::TypeClassifier;
pub use extract::SchemaExtractor;
pub use orchestrator::{DocumentPipeline, MediaKind, ScanOutcome};

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::registry::RegistryError;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// A type name not in the registry was requested by internal code —
    /// contract violation, not a soft failure.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Unsupported media type: {0}")]
    UnsupportedMedia(String),
}

/// Result of the classification stage. Exactly one of the two — a name
/// drawn from the registry, or the explicit unclassified marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassificationOutcome {
    Known(String),
    Unclassified,
}

/// A populated document record: the classified type plus a field-to-value
/// mapping. Values may be null per field — extraction is best-effort.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractedDocument {
    #[serde(rename = "type")]
    pub type_name: String,
    pub details: Map<String, Value>,
}

/// Per-request extraction options, derived from process settings.
#[derive(Debug, Clone)]
pub struct ExtractionOptions {
    /// ISO 639-1 target language code.
    pub language: String,
    /// When false, no translation clause appears in the prompt at all.
    pub translate: bool,
}

//! Inference backend boundary.
//!
//! Everything the pipeline needs from the text/vision backend goes through
//! the `ChatClient` trait so classification, extraction and vision
//! acquisition can be exercised against mocks. The production
//! implementation lives in `openai.rs`.

pub mod openai;

pub use openai::OpenAiClient;

use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("Inference backend is not reachable at {0}")]
    Connection(String),

    #[error("Inference request timed out after {0}s")]
    Timeout(u64),

    #[error("Inference backend returned error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Malformed backend response: {0}")]
    MalformedResponse(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),
}

/// One structured-output request: instruction text plus a JSON-schema
/// output constraint the backend must conform to.
#[derive(Debug)]
pub struct StructuredRequest<'a> {
    pub system: &'a str,
    pub user: &'a str,
    /// Schema label passed to the backend (required by the wire format).
    pub schema_name: &'a str,
    pub schema: &'a Value,
}

/// Backend abstraction (allows mocking).
///
/// Implementations are blocking; async callers hop through
/// `tokio::task::spawn_blocking`.
pub trait ChatClient: Send + Sync {
    /// Text-in, schema-constrained-JSON-out.
    fn complete_structured(&self, request: &StructuredRequest<'_>)
        -> Result<Value, InferenceError>;

    /// Image + instruction in, plain text out.
    fn complete_vision(
        &self,
        instruction: &str,
        image_data_url: &str,
    ) -> Result<String, InferenceError>;
}

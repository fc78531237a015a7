//! Type classification stage.
//!
//! Asks the backend to pick one name from the registry, constrained to a
//! single optional `type` field. The candidate names travel in the prompt,
//! not the schema — the constraint stays constant-size as types are added.

use std::sync::Arc;

use tracing::{debug, warn};

use super::ClassificationOutcome;
use crate::inference::{ChatClient, StructuredRequest};
use crate::registry::{schema, DocumentTypeRegistry};

/// Classifies raw text into one of the registered document types.
pub struct TypeClassifier {
    client: Arc<dyn ChatClient>,
}

impl TypeClassifier {
    pub fn new(client: Arc<dyn ChatClient>) -> Self {
        Self { client }
    }

    /// Classify `text` against the registered type names.
    ///
    /// Fail-soft: backend failure, a missing type, or a name outside the
    /// registry all yield `Unclassified`. The classifier never guesses.
    pub fn classify(&self, registry: &DocumentTypeRegistry, text: &str) -> ClassificationOutcome {
        let system = classification_prompt(&registry.type_names());
        let user = format!("Text:\n{text}\n");
        let constraint = schema::classification_schema();

        let request = StructuredRequest {
            system: &system,
            user: &user,
            schema_name: "document_type",
            schema: &constraint,
        };

        let response = match self.client.complete_structured(&request) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Classification backend call failed, reporting unclassified");
                return ClassificationOutcome::Unclassified;
            }
        };

        match response.get("type").and_then(|v| v.as_str()) {
            Some(name) if registry.contains(name) => {
                debug!(doc_type = name, "Classified document");
                ClassificationOutcome::Known(name.to_string())
            }
            Some(name) => {
                warn!(doc_type = name, "Backend returned a name outside the registry");
                ClassificationOutcome::Unclassified
            }
            None => {
                debug!("Backend reported no matching type");
                ClassificationOutcome::Unclassified
            }
        }
    }
}

fn classification_prompt(type_names: &[&str]) -> String {
    format!(
        "Given the following text data, identify the document type\n\
         The document type must be one of the following: {}\n\
         If the document does not meet any of the above types set the type to None\n",
        type_names.join(", ")
    )
}

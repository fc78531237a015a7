//! Schema-driven extraction stage.
//!
//! Looks up the prebuilt output schema for the classified type and asks the
//! backend to populate exactly those fields. The response is filtered back
//! against the descriptor so the invariant holds even if the backend
//! ignores the constraint.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::{ExtractedDocument, ExtractionOptions, PipelineError};
use crate::inference::{ChatClient, StructuredRequest};
use crate::registry::DocumentTypeRegistry;

/// Populates a descriptor's fields from raw text.
pub struct SchemaExtractor {
    client: Arc<dyn ChatClient>,
}

impl SchemaExtractor {
    pub fn new(client: Arc<dyn ChatClient>) -> Self {
        Self { client }
    }

    /// Extract a structured record of type `type_name` from `text`.
    ///
    /// An unknown type is a hard error (caller contract violation). A
    /// backend failure or an unpopulated result is soft: `Ok(None)`,
    /// surfaced to the caller as Missing Data.
    pub fn extract(
        &self,
        registry: &DocumentTypeRegistry,
        text: &str,
        type_name: &str,
        options: &ExtractionOptions,
    ) -> Result<Option<ExtractedDocument>, PipelineError> {
        let entry = registry.lookup(type_name)?;

        let system = extraction_prompt(type_name, options);
        let user = format!("Text:\n{text}\n");

        let request = StructuredRequest {
            system: &system,
            user: &user,
            schema_name: "extracted_document",
            schema: &entry.output_schema,
        };

        let response = match self.client.complete_structured(&request) {
            Ok(value) => value,
            Err(e) => {
                warn!(doc_type = type_name, error = %e, "Extraction backend call failed");
                return Ok(None);
            }
        };

        let details = match response.get("details").and_then(|v| v.as_object()) {
            Some(details) => filter_to_declared(details, entry),
            None => {
                warn!(doc_type = type_name, "Backend response carried no details object");
                return Ok(None);
            }
        };

        if details.values().all(Value::is_null) {
            debug!(doc_type = type_name, "Extraction produced no populated fields");
            return Ok(None);
        }

        Ok(Some(ExtractedDocument {
            type_name: type_name.to_string(),
            details,
        }))
    }
}

/// Keep only fields declared on the descriptor, in declaration order.
fn filter_to_declared(
    details: &Map<String, Value>,
    entry: &crate::registry::RegisteredType,
) -> Map<String, Value> {
    let mut filtered = Map::new();
    for field in &entry.descriptor.fields {
        if let Some(value) = details.get(field.name) {
            filtered.insert(field.name.to_string(), value.clone());
        }
    }
    filtered
}

/// Build the extraction instruction. The translation clause is appended
/// only when enabled — a disabled flag leaves no trace in the prompt.
fn extraction_prompt(type_name: &str, options: &ExtractionOptions) -> String {
    let mut prompt = format!(
        "Given the following text data and its type, extract the relevant details.\n\
         The document type is: {type_name}\n\
         Dates should be formatted as YYYY-MM-DD\n"
    );
    if options.translate {
        prompt.push_str(&format!(
            "ALWAYS TRANSLATE THE EXTRACTED VALUES IN THE FOLLOWING LANGUAGE, \
             LANGUAGE CODE: {}\n",
            options.language
        ));
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::openai::{FailingChatClient, MockChatClient};
    use crate::registry::{builtin_registry, RegistryError};
    use serde_json::json;

    fn options() -> ExtractionOptions {
        ExtractionOptions {
            language: "en".into(),
            translate: false,
        }
    }

    #[test]
    fn extracts_declared_fields() {
        let registry = builtin_registry().unwrap();
        let extractor = SchemaExtractor::new(Arc::new(MockChatClient::structured(json!({
            "type": "Receipt",
            "details": {
                "store_name": "Corner Cafe",
                "items": ["Espresso | 2 | 2.50 | 5.00", "Croissant | 1 | 3.20 | 3.20"],
                "subtotal": 8.20,
                "total_amount": 9.02,
                "tax": 0.82
            }
        }))));

        let doc = extractor
            .extract(&registry, "receipt text", "Receipt", &options())
            .unwrap()
            .unwrap();

        assert_eq!(doc.type_name, "Receipt");
        assert_eq!(doc.details["items"].as_array().unwrap().len(), 2);
        assert_eq!(doc.details["total_amount"], json!(9.02));
    }

    #[test]
    fn extraneous_fields_are_dropped() {
        let registry = builtin_registry().unwrap();
        let extractor = SchemaExtractor::new(Arc::new(MockChatClient::structured(json!({
            "type": "Passport",
            "details": {
                "passport_number": "X1234567",
                // Fields from other types must never leak through.
                "total_amount": 99.0,
                "skills": ["forgery"]
            }
        }))));

        let doc = extractor
            .extract(&registry, "passport text", "Passport", &options())
            .unwrap()
            .unwrap();

        assert_eq!(doc.details["passport_number"], "X1234567");
        assert!(!doc.details.contains_key("total_amount"));
        assert!(!doc.details.contains_key("skills"));

        let descriptor = &registry.lookup("Passport").unwrap().descriptor;
        for field_name in doc.details.keys() {
            assert!(descriptor.declares(field_name));
        }
    }

    #[test]
    fn unknown_type_is_a_hard_error() {
        let registry = builtin_registry().unwrap();
        let extractor =
            SchemaExtractor::new(Arc::new(MockChatClient::structured(json!({"details": {}}))));

        let err = extractor
            .extract(&registry, "text", "Invoice", &options())
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Registry(RegistryError::UnknownType(name)) if name == "Invoice"
        ));
    }

    #[test]
    fn all_null_result_is_missing_data() {
        let registry = builtin_registry().unwrap();
        let extractor = SchemaExtractor::new(Arc::new(MockChatClient::structured(json!({
            "type": "CV",
            "details": { "full_name": null, "email": null }
        }))));

        let result = extractor
            .extract(&registry, "empty text", "CV", &options())
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn backend_failure_is_soft_none() {
        let registry = builtin_registry().unwrap();
        let extractor = SchemaExtractor::new(Arc::new(FailingChatClient));

        let result = extractor
            .extract(&registry, "text", "Receipt", &options())
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn translation_clause_present_only_when_enabled() {
        let disabled = extraction_prompt("Receipt", &options());
        assert!(!disabled.contains("TRANSLATE"));
        assert!(disabled.contains("YYYY-MM-DD"));

        let enabled = extraction_prompt(
            "Receipt",
            &ExtractionOptions {
                language: "fr".into(),
                translate: true,
            },
        );
        assert!(enabled.contains("TRANSLATE"));
        assert!(enabled.contains("LANGUAGE CODE: fr"));
    }

    #[test]
    fn extraction_is_idempotent_with_deterministic_backend() {
        let registry = builtin_registry().unwrap();
        let extractor = SchemaExtractor::new(Arc::new(MockChatClient::structured(json!({
            "type": "IDCard",
            "details": { "id_number": "ID-001", "full_name": "Anna Eriksson" }
        }))));

        let a = extractor
            .extract(&registry, "same text", "IDCard", &options())
            .unwrap()
            .unwrap();
        let b = extractor
            .extract(&registry, "same text", "IDCard", &options())
            .unwrap()
            .unwrap();
        assert_eq!(serde_json::to_value(&a).unwrap(), serde_json::to_value(&b).unwrap());
    }
}

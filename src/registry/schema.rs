//! Descriptor-to-schema compiler.
//!
//! Turns a `DocumentTypeDescriptor` into a strict JSON-schema object used
//! as the inference backend's output constraint. Compiled once per type at
//! registration; only the chosen type's fields are ever presented to the
//! backend, never the union of all registered types.

use serde_json::{json, Map, Value};

use super::{DocumentTypeDescriptor, FieldKind};

/// JSON-schema type for one field kind. Every field is nullable because
/// extraction is best-effort: the model reports `null` for values it
/// cannot find rather than inventing them.
fn field_schema(kind: FieldKind, description: Option<&str>) -> Value {
    let mut schema = match kind {
        FieldKind::Text => json!({ "type": ["string", "null"] }),
        FieldKind::Number => json!({ "type": ["number", "null"] }),
        FieldKind::TextList => json!({
            "type": ["array", "null"],
            "items": { "type": "string" }
        }),
    };

    if let Some(desc) = description {
        schema["description"] = Value::String(desc.to_string());
    }
    schema
}

/// Compile the full output constraint for one document type.
///
/// Shape mirrors the wire contract: `{type, details}` where `details`
/// carries exactly the descriptor's declared fields. `additionalProperties`
/// is false so the backend cannot leak fields from other types, and all
/// properties are listed as required with nullable types — the strict
/// structured-output dialect rejects schemas with optional keys.
pub fn compile_output_schema(descriptor: &DocumentTypeDescriptor) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for field in &descriptor.fields {
        properties.insert(
            field.name.to_string(),
            field_schema(field.kind, field.description),
        );
        required.push(Value::String(field.name.to_string()));
    }

    json!({
        "type": "object",
        "properties": {
            "type": { "type": "string", "const": descriptor.name },
            "details": {
                "type": "object",
                "properties": Value::Object(properties),
                "required": Value::Array(required),
                "additionalProperties": false
            }
        },
        "required": ["type", "details"],
        "additionalProperties": false
    })
}

/// Output constraint for the classification stage: a single optional
/// type-name field. Deliberately schema-free about the candidate names —
/// those travel in the prompt, keeping this constraint constant-size as
/// the registry grows.
pub fn classification_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "type": {
                "type": ["string", "null"],
                "description": "The type of the document"
            }
        },
        "required": ["type"],
        "additionalProperties": false
    })
}

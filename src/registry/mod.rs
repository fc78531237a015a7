//! Document type registry — the closed set of known document schemas.
//!
//! Descriptors are registered explicitly at startup (no runtime
//! introspection) and the registry is never mutated afterwards, so
//! concurrent reads are safe without locking. Each `register` call also
//! compiles the descriptor into a JSON-schema output constraint, giving a
//! prebuilt lookup table instead of per-request schema synthesis.

pub mod builtin;
pub mod schema;

pub use builtin::builtin_registry;

use std::collections::HashMap;

use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Document type already registered: {0}")]
    DuplicateType(String),

    #[error("Unknown document type: {0}")]
    UnknownType(String),
}

/// Primitive field kinds a descriptor may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
    TextList,
}

/// One typed, optionally-required field of a document type.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    /// Human-readable hint injected into the output schema to steer
    /// extraction ("Name of the store or merchant", ...).
    pub description: Option<&'static str>,
}

impl FieldSpec {
    pub fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: false,
            description: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn describe(mut self, description: &'static str) -> Self {
        self.description = Some(description);
        self
    }
}

/// The declared shape of one document type: a unique name plus an ordered
/// collection of fields. Immutable once registered.
#[derive(Debug, Clone)]
pub struct DocumentTypeDescriptor {
    pub name: &'static str,
    pub fields: Vec<FieldSpec>,
}

impl DocumentTypeDescriptor {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    /// Whether `field_name` is declared on this descriptor.
    pub fn declares(&self, field_name: &str) -> bool {
        self.fields.iter().any(|f| f.name == field_name)
    }
}

/// A registered type: its descriptor plus the schema compiled from it.
#[derive(Debug)]
pub struct RegisteredType {
    pub descriptor: DocumentTypeDescriptor,
    /// JSON-schema output constraint, compiled once at registration.
    pub output_schema: Value,
}

/// Name-to-descriptor lookup over the closed set of document types.
///
/// Built once at process start; shared read-only across requests.
#[derive(Debug, Default)]
pub struct DocumentTypeRegistry {
    entries: Vec<RegisteredType>,
    by_name: HashMap<&'static str, usize>,
}

impl DocumentTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor, compiling its output schema. Duplicate names
    /// are a startup error.
    pub fn register(&mut self, descriptor: DocumentTypeDescriptor) -> Result<(), RegistryError> {
        if self.by_name.contains_key(descriptor.name) {
            return Err(RegistryError::DuplicateType(descriptor.name.to_string()));
        }

        let output_schema = schema::compile_output_schema(&descriptor);
        self.by_name.insert(descriptor.name, self.entries.len());
        self.entries.push(RegisteredType {
            descriptor,
            output_schema,
        });
        Ok(())
    }

    /// Registered type names, in registration order.
    pub fn type_names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|e| e.descriptor.name).collect()
    }

    /// Look up a registered type by name.
    pub fn lookup(&self, name: &str) -> Result<&RegisteredType, RegistryError> {
        self.by_name
            .get(name)
            .map(|&i| &self.entries[i])
            .ok_or_else(|| RegistryError::UnknownType(name.to_string()))
    }

    /// Whether `name` is a registered type name.
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

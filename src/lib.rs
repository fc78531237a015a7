//! docscan — document classification and field-extraction service.
//!
//! Accepts an uploaded image or PDF, acquires its textual content (local
//! OCR or vision delegation), classifies it against a closed registry of
//! document types, and extracts a structured record using a schema
//! compiled for exactly that type.

pub mod acquire;
pub mod config;
pub mod context;
pub mod inference;
pub mod pipeline;
pub mod registry;
pub mod server;

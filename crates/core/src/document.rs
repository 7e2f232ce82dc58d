//! Document model
//!
//! A document is an ordered JSON object. Vertex collections identify records
//! by `_key`; edge collections additionally carry `_from`/`_to` references.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A JSON record. Field order is preserved as received.
pub type Document = Map<String, Value>;

/// Primary key attribute.
pub const KEY_FIELD: &str = "_key";
/// Fully qualified `collection/key` attribute set by the backend.
pub const ID_FIELD: &str = "_id";
/// Edge source reference.
pub const FROM_FIELD: &str = "_from";
/// Edge target reference.
pub const TO_FIELD: &str = "_to";

/// Kind of collection a schema is registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// Plain documents.
    Vertex,
    /// Documents linking two vertices via `_from`/`_to`.
    Edge,
}

impl DocumentKind {
    /// Name used by the spec directory layout (`schemas/vertices`, `schemas/edges`).
    pub fn plural(&self) -> &'static str {
        match self {
            DocumentKind::Vertex => "vertices",
            DocumentKind::Edge => "edges",
        }
    }
}

/// Returns the document's `_key` when present as a string.
pub fn document_key(doc: &Document) -> Option<&str> {
    doc.get(KEY_FIELD).and_then(Value::as_str)
}

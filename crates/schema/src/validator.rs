//! Compiled collection schemas and single-document validation.
//!
//! Validation is synchronous and side-effect free. Only the first violation
//! of a document is reported, with enough context (keyword, keyword value,
//! failing fragment) for a client to render a precise diagnostic.

use std::fmt;
use std::sync::Arc;

use docgate_core::{DocumentKind, Error, Result};
use serde_json::Value;

use crate::loader::SpecError;
use crate::registry::SchemaRegistry;

/// A JSON Schema registered for exactly one collection.
pub struct Schema {
    name: String,
    kind: DocumentKind,
    source: Value,
    validator: jsonschema::Validator,
}

impl Schema {
    /// Compile `source` as the schema for collection `name`.
    ///
    /// # Errors
    ///
    /// Returns [`SpecError::InvalidSchema`] if `source` is not a valid JSON Schema.
    pub fn compile(
        name: impl Into<String>,
        kind: DocumentKind,
        source: Value,
    ) -> std::result::Result<Self, SpecError> {
        let name = name.into();
        let validator =
            jsonschema::validator_for(&source).map_err(|e| SpecError::InvalidSchema {
                name: name.clone(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            name,
            kind,
            source,
            validator,
        })
    }

    /// Collection this schema governs.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the collection holds vertices or edges.
    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    /// The schema document as registered.
    pub fn source(&self) -> &Value {
        &self.source
    }

    /// Validate one document.
    pub fn validate(&self, instance: &Value) -> ValidationOutcome {
        match self.validator.iter_errors(instance).next() {
            None => ValidationOutcome::Valid,
            Some(err) => ValidationOutcome::Invalid(self.violation(err)),
        }
    }

    fn violation(&self, err: jsonschema::ValidationError<'_>) -> Violation {
        let schema_path = err.schema_path.as_str().to_string();
        let segments: Vec<&str> = schema_path.split('/').filter(|s| !s.is_empty()).collect();

        // The keyword is the last non-index segment: `/properties/tags/items/0`
        // points below `items`.
        let keyword_at = segments.iter().rposition(|s| s.parse::<usize>().is_err());
        let (validator, schema, validator_value) = match keyword_at {
            Some(i) => (
                unescape(segments[i]),
                self.lookup(&segments[..i]),
                self.lookup(&segments[..=i]),
            ),
            None => (String::new(), self.source.clone(), Value::Null),
        };

        Violation {
            message: err.to_string(),
            instance: err.instance.into_owned(),
            schema,
            schema_path,
            validator,
            validator_value,
        }
    }

    /// Walk `segments` from the schema root. A `$ref` segment continues at
    /// the local target of that node's reference.
    fn lookup(&self, segments: &[&str]) -> Value {
        let mut node = &self.source;
        for segment in segments {
            let reference = node.get("$ref").and_then(Value::as_str);
            let next = match reference {
                Some(reference) if *segment == "$ref" => self.resolve_ref(reference),
                _ => step(node, &unescape(segment)),
            };
            match next {
                Some(found) => node = found,
                None => return Value::Null,
            }
        }
        node.clone()
    }

    /// Target of a `#...` reference inside this schema. Remote references
    /// resolve to nothing.
    fn resolve_ref(&self, reference: &str) -> Option<&Value> {
        let pointer = reference.strip_prefix('#')?;
        self.source.pointer(pointer)
    }
}

fn step<'a>(node: &'a Value, segment: &str) -> Option<&'a Value> {
    match node {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

fn unescape(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

/// Result of validating one document.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome {
    /// The document satisfies the schema.
    Valid,
    /// The document violates the schema.
    Invalid(Violation),
}

/// The first schema violation found in a document.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    /// Human-readable diagnostic.
    pub message: String,
    /// The instance fragment that failed.
    pub instance: Value,
    /// The (sub)schema holding the violated keyword.
    pub schema: Value,
    /// JSON pointer of the violated keyword inside the schema.
    pub schema_path: String,
    /// The violated keyword, e.g. `required`.
    pub validator: String,
    /// The schema value of the violated keyword.
    pub validator_value: Value,
}

impl From<Violation> for Error {
    fn from(v: Violation) -> Self {
        Error::Validation {
            message: v.message,
            instance: v.instance,
            schema: v.schema,
            schema_path: v.schema_path,
            validator: v.validator,
            validator_value: v.validator_value,
        }
    }
}

/// Validate `document` against the schema registered for `collection`.
///
/// # Errors
///
/// Returns [`Error::SchemaNotFound`] when the collection has no schema.
pub fn validate(
    registry: &dyn SchemaRegistry,
    collection: &str,
    document: &Value,
) -> Result<ValidationOutcome> {
    let schema: Arc<Schema> = registry
        .schema_for(collection)
        .ok_or_else(|| Error::SchemaNotFound {
            collection: collection.to_string(),
        })?;
    Ok(schema.validate(document))
}

//! Error types for Docgate
//!
//! All request-level failures are represented by the [`Error`] enum. Errors are:
//! - **Structured**: each variant carries the fields a client needs to render
//!   a precise diagnostic
//! - **Serializable**: [`Error::to_body`] produces the JSON body returned over HTTP
//! - **Lossless**: backend messages are carried verbatim, never reclassified
//!
//! Per-document duplicate conflicts are not errors at this level; they are
//! reported as [`WriteOutcome::Conflict`](crate::WriteOutcome) and folded into
//! batch counters.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error as ThisError;

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, Error>;

/// Result type alias for backend adapter calls
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Gateway errors.
///
/// # Categories
///
/// | Category | Variants | Description |
/// |----------|----------|-------------|
/// | Payload | `Parse`, `Validation` | Batch rejected before any write |
/// | Not Found | `SchemaNotFound`, `ViewNotFound`, `CursorNotFound` | Unknown name or id |
/// | Backend | `BackendExecution`, `BackendUnavailable` | Passed through from the database |
/// | Request | `InvalidParameter` | Malformed query parameters |
/// | System | `Internal` | Invariant violation |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ThisError)]
pub enum Error {
    // ==================== Payload ====================
    /// A payload line is not a JSON object.
    #[error("Unable to parse {reason}")]
    Parse {
        /// Parser diagnostic.
        reason: String,
        /// 1-based line of the payload that failed.
        pos: usize,
        /// The complete payload as received.
        source_json: String,
    },

    /// A document violates its collection schema.
    #[error("{message}")]
    Validation {
        /// Validator diagnostic, e.g. `"_key" is a required property`.
        message: String,
        /// The instance fragment that failed.
        instance: Value,
        /// The (sub)schema holding the violated keyword.
        schema: Value,
        /// JSON pointer of the violated keyword inside the schema.
        schema_path: String,
        /// The violated keyword, e.g. `required`.
        validator: String,
        /// The schema value of that keyword, e.g. `["_key"]`.
        validator_value: Value,
    },

    // ==================== Not Found ====================
    /// No schema is registered for the collection.
    #[error("Schema does not exist for collection {collection}")]
    SchemaNotFound {
        /// Requested collection.
        collection: String,
    },

    /// No view is registered under the name.
    #[error("View does not exist.")]
    ViewNotFound {
        /// Requested view name.
        name: String,
    },

    /// The cursor id is unknown, exhausted, or expired.
    #[error("cursor not found")]
    CursorNotFound {
        /// Requested cursor id.
        cursor_id: String,
    },

    // ==================== Backend ====================
    /// The database rejected a query or write.
    #[error("ArangoDB server error.")]
    BackendExecution {
        /// Backend message, verbatim.
        message: String,
    },

    /// The database could not be reached or answered with garbage.
    #[error("Database unavailable: {reason}")]
    BackendUnavailable {
        /// Transport or protocol failure description.
        reason: String,
    },

    // ==================== Request ====================
    /// A request parameter is missing or malformed.
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: String,
        /// What is wrong with it.
        reason: String,
    },

    // ==================== System ====================
    /// Internal error (bug or invariant violation)
    #[error("Internal error: {reason}")]
    Internal {
        /// Description.
        reason: String,
    },
}

impl Error {
    /// Render the JSON body returned to clients.
    ///
    /// Every body carries an `error` field; kind-specific fields are added
    /// alongside it.
    pub fn to_body(&self) -> Value {
        match self {
            Error::Parse {
                pos, source_json, ..
            } => json!({
                "error": self.to_string(),
                "pos": pos,
                "source_json": source_json,
            }),
            Error::Validation {
                message,
                instance,
                schema,
                schema_path,
                validator,
                validator_value,
            } => json!({
                "error": message,
                "instance": instance,
                "schema": schema,
                "schema_path": schema_path,
                "validator": validator,
                "validator_value": validator_value,
            }),
            Error::SchemaNotFound { collection } => json!({
                "error": self.to_string(),
                "name": collection,
            }),
            Error::ViewNotFound { name } => json!({
                "error": self.to_string(),
                "name": name,
            }),
            Error::CursorNotFound { .. } => json!({
                "error": true,
                "arango_message": self.to_string(),
            }),
            Error::BackendExecution { message } => json!({
                "error": self.to_string(),
                "arango_message": message,
            }),
            Error::InvalidParameter { name, .. } => json!({
                "error": self.to_string(),
                "name": name,
            }),
            Error::BackendUnavailable { .. } | Error::Internal { .. } => json!({
                "error": self.to_string(),
            }),
        }
    }
}

/// Errors reported by a [`Backend`](crate::Backend) implementation.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum BackendError {
    /// The database executed the request and rejected it.
    #[error("{message}")]
    Query {
        /// Database message, verbatim.
        message: String,
    },

    /// The database could not be reached or replied with an unreadable body.
    #[error("backend unavailable: {reason}")]
    Unavailable {
        /// Transport or protocol failure description.
        reason: String,
    },
}

impl BackendError {
    /// Shorthand for a rejected request.
    pub fn query(message: impl Into<String>) -> Self {
        BackendError::Query {
            message: message.into(),
        }
    }

    /// Shorthand for a transport failure.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        BackendError::Unavailable {
            reason: reason.into(),
        }
    }
}

impl From<BackendError> for Error {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Query { message } => Error::BackendExecution { message },
            BackendError::Unavailable { reason } => Error::BackendUnavailable { reason },
        }
    }
}

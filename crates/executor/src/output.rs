//! Output enum for command execution results.
//!
//! Each [`Command`](crate::Command) variant maps to exactly one `Output`
//! variant, documented on the command.

use docgate_core::{BackendStatus, BatchOutcome, QueryResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Successful command execution results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Output {
    /// Counters for one bulk payload.
    Batch(BatchOutcome),

    /// One page of query results.
    Query(QueryResult),

    /// Sorted view names.
    ViewList(Vec<String>),

    /// Query text of one view.
    ViewSource(String),

    /// Collections with a schema, by kind.
    SchemaList {
        vertices: Vec<String>,
        edges: Vec<String>,
    },

    /// One schema document as registered.
    Schema(Value),

    /// Backend reachability and gateway version.
    Status {
        arangodb_status: BackendStatus,
        version: String,
    },
}

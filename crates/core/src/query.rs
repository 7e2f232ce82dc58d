//! Query result pages.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Named values substituted into a query at execution time.
///
/// Collection-valued parameters use a leading `@` in the name
/// (`@collection` binds `@@collection` in the query text).
pub type BindVars = Map<String, Value>;

/// One page of results as returned to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Rows in this page.
    pub results: Vec<Value>,
    /// Total rows produced by the query execution.
    pub count: u64,
    /// Whether a further page can be fetched with `cursor_id`.
    pub has_more: bool,
    /// Cursor handle for the next page; `null` once the result is complete.
    pub cursor_id: Option<String>,
    /// Backend execution metadata.
    pub stats: Value,
}

/// One page of results as produced by a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPage {
    /// Rows in this page.
    pub results: Vec<Value>,
    /// Total rows, when the backend reports it.
    pub count: Option<u64>,
    /// Whether the backend holds further rows.
    pub has_more: bool,
    /// Backend token for the next page, present when `has_more`.
    pub continuation: Option<String>,
    /// Backend execution metadata.
    pub stats: Value,
}

impl QueryPage {
    /// A final page holding every row.
    pub fn complete(results: Vec<Value>, stats: Value) -> Self {
        let count = results.len() as u64;
        Self {
            results,
            count: Some(count),
            has_more: false,
            continuation: None,
            stats,
        }
    }
}

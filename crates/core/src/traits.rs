//! Backend adapter abstraction
//!
//! The [`Backend`] trait is the only seam between the gateway and the
//! database. It lets the in-process store used for tests and the HTTP
//! adapter for a real server be swapped without touching upper layers
//! (ingestion, cursors, query routing).
//!
//! Thread safety: all methods must be safe to call concurrently from
//! multiple threads (requires Send + Sync). Calls may block on network I/O;
//! callers never hold a shared lock while calling in.

use serde::{Deserialize, Serialize};

use crate::document::{Document, DocumentKind};
use crate::error::BackendResult;
use crate::outcome::WriteOutcome;
use crate::query::{BindVars, QueryPage};

/// Reachability of the backend, as reported on the status endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendStatus {
    /// Reachable and the configured credentials are accepted.
    ConnectedAuthorized,
    /// Reachable but the credentials are rejected.
    ConnectedUnauthorized,
    /// Not reachable.
    Unreachable,
}

/// Storage and query execution adapter.
pub trait Backend: Send + Sync {
    /// Create the collection if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses to create it.
    fn ensure_collection(&self, collection: &str, kind: DocumentKind) -> BackendResult<()>;

    /// Insert documents without overwriting.
    ///
    /// Returns one outcome per document, in submission order: `Created`, or
    /// `Conflict` when the key already exists, or `Failed`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request as a whole fails (unknown collection,
    /// transport failure).
    fn insert(&self, collection: &str, docs: &[Document]) -> BackendResult<Vec<WriteOutcome>>;

    /// Merge documents into existing ones, matched by `_key`.
    ///
    /// Returns `Updated` or `Failed` per document.
    ///
    /// # Errors
    ///
    /// Returns an error if the request as a whole fails.
    fn update(&self, collection: &str, docs: &[Document]) -> BackendResult<Vec<WriteOutcome>>;

    /// Overwrite existing documents, matched by `_key`.
    ///
    /// Returns `Updated` or `Failed` per document.
    ///
    /// # Errors
    ///
    /// Returns an error if the request as a whole fails.
    fn replace(&self, collection: &str, docs: &[Document]) -> BackendResult<Vec<WriteOutcome>>;

    /// Execute a query, returning at most `batch_size` rows.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Query`](crate::BackendError) with the
    /// database's message for syntax, bind-variable or collection errors.
    fn query(&self, query: &str, bind_vars: &BindVars, batch_size: usize)
        -> BackendResult<QueryPage>;

    /// Fetch the page following `continuation`.
    ///
    /// # Errors
    ///
    /// Returns an error if the continuation is unknown to the backend.
    fn next_page(&self, continuation: &str) -> BackendResult<QueryPage>;

    /// Release the server-side state behind `continuation`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend could not be told.
    fn discard(&self, continuation: &str) -> BackendResult<()>;

    /// Probe reachability.
    fn status(&self) -> BackendStatus;
}

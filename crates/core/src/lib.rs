//! Core types and traits for Docgate
//!
//! This crate defines the foundational types shared by every layer:
//! - Document: JSON record written to or read from a collection
//! - DocumentKind: vertex vs. edge collections
//! - DuplicatePolicy: what a write does when the key already exists
//! - BatchOutcome / WriteOutcome: aggregate and per-item write results
//! - QueryResult / QueryPage: client-facing and backend-facing query pages
//! - Error: the gateway error taxonomy, renderable as a JSON body
//! - Backend: the storage adapter seam

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod document;
pub mod error;
pub mod outcome;
pub mod policy;
pub mod query;
pub mod traits;

pub use document::{
    document_key, Document, DocumentKind, FROM_FIELD, ID_FIELD, KEY_FIELD, TO_FIELD,
};
pub use error::{BackendError, BackendResult, Error, Result};
pub use outcome::{BatchOutcome, WriteOutcome};
pub use policy::DuplicatePolicy;
pub use query::{BindVars, QueryPage, QueryResult};
pub use traits::{Backend, BackendStatus};

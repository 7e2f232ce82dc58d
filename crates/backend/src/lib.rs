//! Backend adapters for Docgate
//!
//! Two implementations of [`docgate_core::Backend`]:
//!
//! - [`MemoryBackend`]: an in-process document store with server-side
//!   cursors and a small subset of AQL. Used by tests and by
//!   `backend.kind = "memory"` deployments.
//! - [`ArangoBackend`]: a blocking HTTP client for the ArangoDB REST API.

#![warn(missing_docs)]

mod arango;
mod memory;

pub use arango::{ArangoBackend, ArangoOptions};
pub use memory::MemoryBackend;

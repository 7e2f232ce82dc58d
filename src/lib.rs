//! Docgate - validating gateway in front of a document database
//!
//! Clients submit newline-delimited JSON documents, which are checked against
//! a per-collection JSON Schema before they are written, and run registered
//! queries ("views") whose results are paged through server-held cursors.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::path::Path;
//! use std::sync::Arc;
//! use docgate::{Command, DuplicatePolicy, Executor, ExecutorOptions, MemoryBackend, SpecRegistry};
//!
//! let specs = Arc::new(SpecRegistry::load_dir(Path::new("specs"))?);
//! let executor = Executor::with_specs(Arc::new(MemoryBackend::new()), specs, ExecutorOptions::default());
//!
//! executor.execute(Command::SaveDocuments {
//!     collection: "example_vertices".into(),
//!     payload: r#"{"_key": "a"}"#.into(),
//!     on_duplicate: DuplicatePolicy::Ignore,
//!     display_errors: false,
//! })?;
//! ```
//!
//! # Architecture
//!
//! Every operation is a [`Command`] run by the [`Executor`]. Storage sits
//! behind the [`Backend`] trait; [`MemoryBackend`] and [`ArangoBackend`] are
//! provided. The HTTP surface and the `docgate` binary live in
//! `docgate-server`.

pub use docgate_backend::{ArangoBackend, ArangoOptions, MemoryBackend};
pub use docgate_core::{
    Backend, BackendError, BackendStatus, BatchOutcome, BindVars, Document, DocumentKind,
    DuplicatePolicy, Error, QueryPage, QueryResult, Result, WriteOutcome,
};
pub use docgate_executor::{Command, CommandKind, CursorState, CursorStore, Executor, ExecutorOptions, Output};
pub use docgate_schema::{Schema, SchemaRegistry, SharedSpecs, SpecError, SpecRegistry, ViewRegistry};
pub use docgate_security::{AuthError, Role, TokenTable};
pub use docgate_server::{build_gateway, build_router, Gateway, GatewayConfig, ServeError, SpecReloader};

//! # Docgate Executor
//!
//! The command layer of the gateway. It provides:
//! - [`Command`]/[`Output`] - the operations and their results
//! - [`Executor`] - runs commands against a backend and spec registries
//! - [`CursorStore`] - server-held pagination state
//!
//! ## Quick Start
//!
//! ```text
//! use docgate_executor::{Command, Executor, ExecutorOptions};
//!
//! let executor = Executor::with_specs(backend, specs, ExecutorOptions::default());
//!
//! let output = executor.execute(Command::SaveDocuments {
//!     collection: "example_vertices".into(),
//!     payload: "{\"_key\": \"1\"}\n{\"_key\": \"2\"}".into(),
//!     on_duplicate: DuplicatePolicy::Ignore,
//!     display_errors: false,
//! })?;
//! ```
//!
//! ## Paging
//!
//! | Result size | Response |
//! |-------------|----------|
//! | fits one page | `has_more = false`, `cursor_id = null` |
//! | larger | first page, `has_more = true`, fresh `cursor_id` |
//!
//! A cursor id yields each remaining page exactly once and is gone after the
//! page that reports `has_more = false`.

#![warn(missing_docs)]

mod command;
mod cursor;
mod executor;
mod ingest;
mod output;

// Handler modules
mod handlers;

// Test modules
#[cfg(test)]
mod tests;

pub use command::{Command, CommandKind};
pub use cursor::{CursorState, CursorStore};
pub use executor::{Executor, ExecutorOptions};
pub use output::Output;

pub use docgate_core::{Error, Result};

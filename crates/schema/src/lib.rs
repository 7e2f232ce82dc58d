//! Schema validation and spec registries for Docgate
//!
//! - [`Schema`]: a compiled JSON Schema bound to one collection
//! - [`validate`]: check one document against its collection's schema
//! - [`SchemaRegistry`] / [`ViewRegistry`]: read-only lookups consumed by the executor
//! - [`SpecRegistry`]: in-memory implementation of both, optionally loaded
//!   from a spec directory
//! - [`SharedSpecs`]: a swappable [`SpecRegistry`] for reloads while serving

#![warn(missing_docs)]

mod loader;
mod registry;
mod validator;

pub use loader::SpecError;
pub use registry::{SchemaRegistry, SharedSpecs, SpecRegistry, ViewRegistry};
pub use validator::{validate, Schema, ValidationOutcome, Violation};

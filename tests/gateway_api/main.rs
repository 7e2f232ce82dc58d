//! Gateway API integration tests
//!
//! Cross-crate tests through the `docgate` facade:
//! - Spec directory loading from disk
//! - Ingest followed by paged queries over the memory backend
//! - Booting an executor from a config file

mod common;

mod boot;
mod ingest_query;
mod spec_dir;

//! Shared helpers for the gateway integration suite.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use docgate::*;
use serde_json::json;

pub const VERTICES: &str = "example_vertices";
pub const EDGES: &str = "example_edges";
pub const LIST_ALL: &str = "list_all_documents_in_collection";
pub const COUNT: &str = "count_documents_in_collection";

/// The `specs/` directory shipped with the repository.
pub fn repo_specs() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("specs")
}

/// Executor over a fresh memory backend with the repository specs loaded
/// and their collections created.
pub fn gateway() -> (Arc<MemoryBackend>, Executor) {
    gateway_with(ExecutorOptions::default())
}

pub fn gateway_with(options: ExecutorOptions) -> (Arc<MemoryBackend>, Executor) {
    let specs = SpecRegistry::load_dir(&repo_specs()).unwrap();
    let backend = Arc::new(MemoryBackend::new());
    for schema in specs.schemas() {
        backend.ensure_collection(schema.name(), schema.kind()).unwrap();
    }
    let executor = Executor::with_specs(backend.clone(), Arc::new(specs), options);
    (backend, executor)
}

pub fn write_file(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

pub fn vertex_lines(range: std::ops::Range<usize>) -> String {
    range
        .map(|i| json!({"_key": format!("v{:04}", i), "name": "name"}).to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn save(
    executor: &Executor,
    collection: &str,
    payload: &str,
    on_duplicate: DuplicatePolicy,
) -> Result<BatchOutcome> {
    match executor.execute(Command::SaveDocuments {
        collection: collection.to_string(),
        payload: payload.to_string(),
        on_duplicate,
        display_errors: true,
    })? {
        Output::Batch(outcome) => Ok(outcome),
        other => panic!("expected Batch, got {:?}", other),
    }
}

pub fn run_view(
    executor: &Executor,
    view: &str,
    collection: &str,
    batch_size: Option<usize>,
) -> Result<QueryResult> {
    let bind_vars = json!({"@collection": collection})
        .as_object()
        .cloned()
        .unwrap();
    match executor.execute(Command::QueryView {
        view: view.to_string(),
        bind_vars,
        batch_size,
    })? {
        Output::Query(result) => Ok(result),
        other => panic!("expected Query, got {:?}", other),
    }
}

pub fn fetch(executor: &Executor, cursor_id: &str) -> Result<QueryResult> {
    match executor.execute(Command::FetchCursor {
        cursor_id: cursor_id.to_string(),
    })? {
        Output::Query(result) => Ok(result),
        other => panic!("expected Query, got {:?}", other),
    }
}

//! Test modules for the executor crate.

pub mod cursors;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use docgate_backend::MemoryBackend;
use docgate_core::{
    Backend, BackendError, BackendResult, BackendStatus, BatchOutcome, BindVars, Document,
    DocumentKind, DuplicatePolicy, QueryPage, QueryResult, WriteOutcome,
};
use docgate_schema::{Schema, SpecRegistry};
use serde_json::{json, Value};

use crate::{Command, Executor, ExecutorOptions, Output, Result};

pub const VERTICES: &str = "example_vertices";
pub const EDGES: &str = "example_edges";
pub const LIST_ALL: &str = "list_all_documents_in_collection";
pub const COUNT: &str = "count_documents_in_collection";

/// Registry with one vertex and one edge collection and two views.
pub fn specs() -> Arc<SpecRegistry> {
    let mut specs = SpecRegistry::new();
    specs
        .register_schema(
            Schema::compile(
                VERTICES,
                DocumentKind::Vertex,
                json!({
                    "type": "object",
                    "required": ["_key"],
                    "properties": {"_key": {"type": "string"}}
                }),
            )
            .unwrap(),
        )
        .register_schema(
            Schema::compile(
                EDGES,
                DocumentKind::Edge,
                json!({
                    "type": "object",
                    "required": ["_from", "_to"],
                    "properties": {
                        "_from": {"type": "string"},
                        "_to": {"type": "string"}
                    }
                }),
            )
            .unwrap(),
        )
        .register_view(LIST_ALL, "// Fetch all documents\nFOR doc IN @@collection\n  RETURN doc")
        .register_view(COUNT, "// Return count of documents\nRETURN LENGTH(@@collection)");
    Arc::new(specs)
}

/// In-memory backend with the fixture collections created.
pub fn memory_backend() -> Arc<MemoryBackend> {
    let backend = Arc::new(MemoryBackend::new());
    backend.ensure_collection(VERTICES, DocumentKind::Vertex).unwrap();
    backend.ensure_collection(EDGES, DocumentKind::Edge).unwrap();
    backend
}

pub fn create_test_executor_with(
    backend: Arc<dyn Backend>,
    options: ExecutorOptions,
) -> Executor {
    Executor::with_specs(backend, specs(), options)
}

/// Executor over a fresh in-memory backend with default options.
pub fn create_test_executor() -> (Arc<MemoryBackend>, Executor) {
    let backend = memory_backend();
    let executor = create_test_executor_with(backend.clone(), ExecutorOptions::default());
    (backend, executor)
}

/// `count` vertex lines with keys `0..count`.
pub fn vertex_payload(count: usize) -> String {
    (0..count)
        .map(|i| json!({"_key": i.to_string(), "n": i}).to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn save(
    executor: &Executor,
    collection: &str,
    payload: &str,
    on_duplicate: DuplicatePolicy,
    display_errors: bool,
) -> Result<BatchOutcome> {
    match executor.execute(Command::SaveDocuments {
        collection: collection.to_string(),
        payload: payload.to_string(),
        on_duplicate,
        display_errors,
    })? {
        Output::Batch(outcome) => Ok(outcome),
        other => panic!("expected Batch, got {:?}", other),
    }
}

pub fn bind(value: Value) -> BindVars {
    match value {
        Value::Object(map) => map,
        _ => panic!("bind vars must be an object"),
    }
}

pub fn query_view(
    executor: &Executor,
    view: &str,
    bind_vars: Value,
    batch_size: Option<usize>,
) -> Result<QueryResult> {
    match executor.execute(Command::QueryView {
        view: view.to_string(),
        bind_vars: bind(bind_vars),
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

/// Wraps a [`MemoryBackend`], counting discards and optionally failing
/// continuation fetches.
pub struct RecordingBackend {
    pub inner: MemoryBackend,
    pub discards: AtomicUsize,
    pub fail_next_page: bool,
}

impl RecordingBackend {
    pub fn new(fail_next_page: bool) -> Arc<Self> {
        let inner = MemoryBackend::new();
        inner.ensure_collection(VERTICES, DocumentKind::Vertex).unwrap();
        inner.ensure_collection(EDGES, DocumentKind::Edge).unwrap();
        Arc::new(Self {
            inner,
            discards: AtomicUsize::new(0),
            fail_next_page,
        })
    }

    pub fn discards(&self) -> usize {
        self.discards.load(Ordering::SeqCst)
    }
}

impl Backend for RecordingBackend {
    fn ensure_collection(&self, collection: &str, kind: DocumentKind) -> BackendResult<()> {
        self.inner.ensure_collection(collection, kind)
    }

    fn insert(&self, collection: &str, docs: &[Document]) -> BackendResult<Vec<WriteOutcome>> {
        self.inner.insert(collection, docs)
    }

    fn update(&self, collection: &str, docs: &[Document]) -> BackendResult<Vec<WriteOutcome>> {
        self.inner.update(collection, docs)
    }

    fn replace(&self, collection: &str, docs: &[Document]) -> BackendResult<Vec<WriteOutcome>> {
        self.inner.replace(collection, docs)
    }

    fn query(
        &self,
        query: &str,
        bind_vars: &BindVars,
        batch_size: usize,
    ) -> BackendResult<QueryPage> {
        self.inner.query(query, bind_vars, batch_size)
    }

    fn next_page(&self, continuation: &str) -> BackendResult<QueryPage> {
        if self.fail_next_page {
            return Err(BackendError::unavailable("connection reset"));
        }
        self.inner.next_page(continuation)
    }

    fn discard(&self, continuation: &str) -> BackendResult<()> {
        self.discards.fetch_add(1, Ordering::SeqCst);
        self.inner.discard(continuation)
    }

    fn status(&self) -> BackendStatus {
        self.inner.status()
    }
}

/// Options with a TTL short enough to expire inside a test.
pub fn short_ttl() -> ExecutorOptions {
    ExecutorOptions {
        cursor_ttl: Duration::from_millis(20),
        ..ExecutorOptions::default()
    }
}

//! In-process document store.
//!
//! Collections live behind one `RwLock`; queries take the read lock, writes
//! the write lock. Query results larger than the requested batch are parked
//! in a cursor table keyed by a continuation token, mirroring the way the
//! database server holds cursors: a continuation is valid until its last page
//! is read or it is discarded.

mod query;

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use docgate_core::{
    Backend, BackendError, BackendResult, BackendStatus, BindVars, Document,
    DocumentKind, QueryPage, WriteOutcome, FROM_FIELD, ID_FIELD, KEY_FIELD, TO_FIELD,
};
use parking_lot::RwLock;
use serde_json::{json, Value};
use tracing::debug;

use self::query::Query;

#[derive(Debug)]
struct Collection {
    kind: DocumentKind,
    docs: BTreeMap<String, Document>,
}

#[derive(Debug)]
struct ParkedRows {
    rows: VecDeque<Value>,
    batch_size: usize,
    count: u64,
    stats: Value,
}

/// In-memory [`Backend`].
///
/// # Example
///
/// ```ignore
/// use docgate_backend::MemoryBackend;
/// use docgate_core::{Backend, DocumentKind};
///
/// let backend = MemoryBackend::new();
/// backend.ensure_collection("people", DocumentKind::Vertex)?;
/// ```
#[derive(Debug, Default)]
pub struct MemoryBackend {
    collections: RwLock<HashMap<String, Collection>>,
    cursors: DashMap<String, ParkedRows>,
    next_key: AtomicU64,
    next_cursor: AtomicU64,
}

impl MemoryBackend {
    /// Create an empty store with no collections.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in `collection`, or `None` if it does not exist.
    pub fn len(&self, collection: &str) -> Option<usize> {
        self.collections.read().get(collection).map(|c| c.docs.len())
    }

    /// Fetch one document by key.
    pub fn get(&self, collection: &str, key: &str) -> Option<Document> {
        self.collections
            .read()
            .get(collection)
            .and_then(|c| c.docs.get(key).cloned())
    }

    /// Number of continuations not yet exhausted or discarded.
    pub fn open_cursors(&self) -> usize {
        self.cursors.len()
    }

    fn generate_key(&self) -> String {
        (self.next_key.fetch_add(1, Ordering::Relaxed) + 1).to_string()
    }

    fn park(&self, rows: VecDeque<Value>, batch_size: usize, count: u64, stats: Value) -> String {
        let id = (self.next_cursor.fetch_add(1, Ordering::Relaxed) + 1).to_string();
        self.cursors.insert(
            id.clone(),
            ParkedRows {
                rows,
                batch_size,
                count,
                stats,
            },
        );
        id
    }

    /// Apply `write` to each document, in order, under the write lock.
    fn write_each<F>(&self, collection: &str, docs: &[Document], mut write: F) -> BackendResult<Vec<WriteOutcome>>
    where
        F: FnMut(&mut Collection, &str, &Document) -> WriteOutcome,
    {
        let mut collections = self.collections.write();
        let target = collections
            .get_mut(collection)
            .ok_or_else(|| collection_not_found(collection))?;
        Ok(docs.iter().map(|doc| write(target, collection, doc)).collect())
    }
}

fn collection_not_found(name: &str) -> BackendError {
    BackendError::query(format!("collection or view not found: {}", name))
}

fn conflict_message(key: &str) -> String {
    format!(
        "unique constraint violated - in index primary of type primary over '_key'; conflicting key: {}",
        key
    )
}

fn failed(message: &str) -> WriteOutcome {
    WriteOutcome::Failed {
        message: message.to_string(),
    }
}

fn stamp(doc: &mut Document, collection: &str, key: &str) {
    doc.insert(KEY_FIELD.to_string(), Value::String(key.to_string()));
    doc.insert(
        ID_FIELD.to_string(),
        Value::String(format!("{}/{}", collection, key)),
    );
}

fn has_edge_attributes(doc: &Document) -> bool {
    [FROM_FIELD, TO_FIELD]
        .iter()
        .all(|f| doc.get(*f).and_then(Value::as_str).is_some_and(|s| s.contains('/')))
}

/// Merge `patch` into `target`, recursing into nested objects.
fn merge(target: &mut Document, patch: &Document) {
    for (field, value) in patch {
        match (target.get_mut(field), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => merge(existing, incoming),
            _ => {
                target.insert(field.clone(), value.clone());
            }
        }
    }
}

/// Resolve the key of an update/replace target, or the reason it cannot be written.
fn existing_key<'a>(target: &Collection, doc: &'a Document) -> Result<&'a str, WriteOutcome> {
    let key = match doc.get(KEY_FIELD) {
        None => return Err(failed("document key is missing")),
        Some(Value::String(key)) if !key.is_empty() => key.as_str(),
        Some(_) => return Err(failed("illegal document key")),
    };
    if !target.docs.contains_key(key) {
        return Err(failed("document not found"));
    }
    Ok(key)
}

impl Backend for MemoryBackend {
    fn ensure_collection(&self, collection: &str, kind: DocumentKind) -> BackendResult<()> {
        let mut collections = self.collections.write();
        collections.entry(collection.to_string()).or_insert_with(|| {
            debug!(collection, ?kind, "creating collection");
            Collection {
                kind,
                docs: BTreeMap::new(),
            }
        });
        Ok(())
    }

    fn insert(&self, collection: &str, docs: &[Document]) -> BackendResult<Vec<WriteOutcome>> {
        self.write_each(collection, docs, |target, name, doc| {
            if target.kind == DocumentKind::Edge && !has_edge_attributes(doc) {
                return failed("edge attribute missing or invalid");
            }
            let key = match doc.get(KEY_FIELD) {
                None => self.generate_key(),
                Some(Value::String(key)) if !key.is_empty() && !key.contains('/') => key.clone(),
                Some(_) => return failed("illegal document key"),
            };
            if target.docs.contains_key(&key) {
                return WriteOutcome::Conflict {
                    message: conflict_message(&key),
                };
            }
            let mut stored = doc.clone();
            stamp(&mut stored, name, &key);
            target.docs.insert(key, stored);
            WriteOutcome::Created
        })
    }

    fn update(&self, collection: &str, docs: &[Document]) -> BackendResult<Vec<WriteOutcome>> {
        self.write_each(collection, docs, |target, _, doc| {
            let key = match existing_key(target, doc) {
                Ok(key) => key,
                Err(outcome) => return outcome,
            };
            if let Some(stored) = target.docs.get_mut(key) {
                let key_and_id = (stored.get(KEY_FIELD).cloned(), stored.get(ID_FIELD).cloned());
                merge(stored, doc);
                if let (Some(k), Some(id)) = key_and_id {
                    stored.insert(KEY_FIELD.to_string(), k);
                    stored.insert(ID_FIELD.to_string(), id);
                }
            }
            WriteOutcome::Updated
        })
    }

    fn replace(&self, collection: &str, docs: &[Document]) -> BackendResult<Vec<WriteOutcome>> {
        self.write_each(collection, docs, |target, name, doc| {
            if target.kind == DocumentKind::Edge && !has_edge_attributes(doc) {
                return failed("edge attribute missing or invalid");
            }
            let key = match existing_key(target, doc) {
                Ok(key) => key.to_string(),
                Err(outcome) => return outcome,
            };
            let mut stored = doc.clone();
            stamp(&mut stored, name, &key);
            target.docs.insert(key, stored);
            WriteOutcome::Updated
        })
    }

    fn query(
        &self,
        query: &str,
        bind_vars: &BindVars,
        batch_size: usize,
    ) -> BackendResult<QueryPage> {
        let started = Instant::now();
        let parsed = Query::parse(query)?;
        let execution = parsed.run(bind_vars, &self.collections.read())?;

        let count = execution.rows.len() as u64;
        let stats = json!({
            "writesExecuted": 0,
            "writesIgnored": 0,
            "scannedFull": execution.scanned,
            "scannedIndex": 0,
            "filtered": execution.filtered,
            "executionTime": started.elapsed().as_secs_f64(),
        });

        let batch_size = batch_size.max(1);
        let mut rows: VecDeque<Value> = execution.rows.into();
        if rows.len() <= batch_size {
            return Ok(QueryPage::complete(rows.into(), stats));
        }
        let first: Vec<Value> = rows.drain(..batch_size).collect();
        let continuation = self.park(rows, batch_size, count, stats.clone());
        debug!(continuation = %continuation, count, "parked query rows");
        Ok(QueryPage {
            results: first,
            count: Some(count),
            has_more: true,
            continuation: Some(continuation),
            stats,
        })
    }

    fn next_page(&self, continuation: &str) -> BackendResult<QueryPage> {
        match self.cursors.entry(continuation.to_string()) {
            Entry::Vacant(_) => Err(BackendError::query("cursor not found")),
            Entry::Occupied(mut entry) => {
                let parked = entry.get_mut();
                let take = parked.batch_size.min(parked.rows.len());
                let results: Vec<Value> = parked.rows.drain(..take).collect();
                let page = QueryPage {
                    results,
                    count: Some(parked.count),
                    has_more: !parked.rows.is_empty(),
                    continuation: None,
                    stats: parked.stats.clone(),
                };
                if page.has_more {
                    Ok(QueryPage {
                        continuation: Some(entry.key().clone()),
                        ..page
                    })
                } else {
                    entry.remove();
                    Ok(page)
                }
            }
        }
    }

    fn discard(&self, continuation: &str) -> BackendResult<()> {
        self.cursors
            .remove(continuation)
            .map(|_| ())
            .ok_or_else(|| BackendError::query("cursor not found"))
    }

    fn status(&self) -> BackendStatus {
        BackendStatus::ConnectedAuthorized
    }
}

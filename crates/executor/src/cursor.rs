//! Server-held query cursors.
//!
//! A cursor owns the undelivered remainder of one query execution: rows
//! already received from the backend but not yet handed out, plus an
//! optional backend continuation for the rest.
//!
//! # Locking
//!
//! The table is a `DashMap` of `Arc<Mutex<CursorEntry>>`. A caller clones
//! the `Arc` out of the map (the shard lock is released at that point) and
//! then locks the entry. Fetching a continuation page happens under that
//! entry's mutex only, so concurrent fetches of one id are linearized while
//! other ids proceed independently. A caller that wins the lock after the
//! cursor was exhausted or expired sees `retired` and gets `CursorNotFound`.
//!
//! Discarding a backend continuation never happens under any lock: the token
//! is taken out of the entry and released once the guard is dropped.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use docgate_core::{Backend, Error, QueryResult, Result};
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

/// What remains of a query result when a cursor is opened.
#[derive(Debug, Clone, Default)]
pub struct CursorState {
    /// Rows already fetched but not yet delivered.
    pub pending: Vec<Value>,
    /// Backend token for rows not yet fetched.
    pub continuation: Option<String>,
}

#[derive(Debug)]
struct CursorEntry {
    pending: VecDeque<Value>,
    continuation: Option<String>,
    count: u64,
    stats: Value,
    page_size: usize,
    deadline: Instant,
    retired: bool,
}

impl CursorEntry {
    fn has_more(&self) -> bool {
        !self.pending.is_empty() || self.continuation.is_some()
    }
}

/// Table of open cursors.
pub struct CursorStore {
    cursors: DashMap<String, Arc<Mutex<CursorEntry>>>,
    backend: Arc<dyn Backend>,
    ttl: Duration,
}

fn not_found(cursor_id: &str) -> Error {
    Error::CursorNotFound {
        cursor_id: cursor_id.to_string(),
    }
}

impl CursorStore {
    /// Create an empty store. Cursors expire `ttl` after their last fetch.
    pub fn new(backend: Arc<dyn Backend>, ttl: Duration) -> Self {
        Self {
            cursors: DashMap::new(),
            backend,
            ttl,
        }
    }

    /// Register a cursor and return its id.
    ///
    /// `count` and `stats` describe the whole execution and are repeated on
    /// every page.
    pub fn create(&self, state: CursorState, count: u64, stats: Value, page_size: usize) -> String {
        let cursor_id = Uuid::new_v4().to_string();
        let entry = CursorEntry {
            pending: state.pending.into(),
            continuation: state.continuation,
            count,
            stats,
            page_size: page_size.max(1),
            deadline: Instant::now() + self.ttl,
            retired: false,
        };
        self.cursors
            .insert(cursor_id.clone(), Arc::new(Mutex::new(entry)));
        debug!(cursor_id = %cursor_id, count, "opened cursor");
        cursor_id
    }

    /// Deliver the next page of `cursor_id`.
    ///
    /// The cursor is deleted as soon as it reports `has_more = false`.
    ///
    /// # Errors
    ///
    /// [`Error::CursorNotFound`] for unknown, exhausted or expired ids; the
    /// backend's error if fetching the next backend page fails (the cursor is
    /// retired in that case).
    pub fn fetch_next(&self, cursor_id: &str) -> Result<QueryResult> {
        let entry = self
            .cursors
            .get(cursor_id)
            .map(|e| Arc::clone(e.value()))
            .ok_or_else(|| not_found(cursor_id))?;
        let mut cursor = entry.lock();
        if cursor.retired {
            return Err(not_found(cursor_id));
        }

        let now = Instant::now();
        if cursor.deadline <= now {
            let token = self.retire(cursor_id, &mut cursor);
            drop(cursor);
            self.discard(cursor_id, token);
            debug!(cursor_id, "cursor expired before fetch");
            return Err(not_found(cursor_id));
        }

        if cursor.pending.is_empty() {
            if let Some(token) = cursor.continuation.take() {
                match self.backend.next_page(&token) {
                    Ok(page) => {
                        if page.has_more && page.continuation.is_none() {
                            let token = self.retire(cursor_id, &mut cursor);
                            drop(cursor);
                            self.discard(cursor_id, token);
                            return Err(Error::Internal {
                                reason: "backend reported more rows without a continuation"
                                    .to_string(),
                            });
                        }
                        cursor.pending.extend(page.results);
                        cursor.continuation = if page.has_more {
                            page.continuation
                        } else {
                            None
                        };
                    }
                    Err(e) => {
                        cursor.continuation = Some(token);
                        let token = self.retire(cursor_id, &mut cursor);
                        drop(cursor);
                        self.discard(cursor_id, token);
                        return Err(e.into());
                    }
                }
            }
        }

        let take = cursor.page_size.min(cursor.pending.len());
        let results: Vec<Value> = cursor.pending.drain(..take).collect();
        let has_more = cursor.has_more();
        let result = QueryResult {
            results,
            count: cursor.count,
            has_more,
            cursor_id: has_more.then(|| cursor_id.to_string()),
            stats: cursor.stats.clone(),
        };

        if has_more {
            cursor.deadline = now + self.ttl;
        } else {
            cursor.retired = true;
            self.cursors.remove(cursor_id);
            debug!(cursor_id, "cursor exhausted");
        }
        Ok(result)
    }

    /// Delete `cursor_id` now. Returns whether it existed.
    pub fn expire(&self, cursor_id: &str) -> bool {
        let Some((_, entry)) = self.cursors.remove(cursor_id) else {
            return false;
        };
        let token = {
            let mut cursor = entry.lock();
            if cursor.retired {
                return false;
            }
            cursor.retired = true;
            cursor.continuation.take()
        };
        self.discard(cursor_id, token);
        true
    }

    /// Delete every cursor whose deadline has passed. Returns how many.
    ///
    /// Cursors locked by an in-flight fetch are skipped; that fetch renews or
    /// retires them.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let mut swept = 0;
        let mut continuations = Vec::new();
        self.cursors.retain(|cursor_id, entry| {
            let Some(mut cursor) = entry.try_lock() else {
                return true;
            };
            if cursor.deadline > now {
                return true;
            }
            cursor.retired = true;
            if let Some(token) = cursor.continuation.take() {
                continuations.push((cursor_id.clone(), token));
            }
            swept += 1;
            false
        });
        for (cursor_id, token) in continuations {
            self.discard(&cursor_id, Some(token));
        }
        if swept > 0 {
            debug!(swept, "swept expired cursors");
        }
        swept
    }

    /// Number of open cursors.
    pub fn len(&self) -> usize {
        self.cursors.len()
    }

    /// Whether no cursor is open.
    pub fn is_empty(&self) -> bool {
        self.cursors.is_empty()
    }

    /// Mark retired and drop from the table. Returns the continuation to
    /// hand to [`discard`](Self::discard) after the entry guard is released.
    #[must_use]
    fn retire(&self, cursor_id: &str, cursor: &mut CursorEntry) -> Option<String> {
        cursor.retired = true;
        cursor.pending.clear();
        self.cursors.remove(cursor_id);
        cursor.continuation.take()
    }

    fn discard(&self, cursor_id: &str, token: Option<String>) {
        let Some(token) = token else {
            return;
        };
        if let Err(e) = self.backend.discard(&token) {
            warn!(cursor_id, error = %e, "failed to discard backend cursor");
        }
    }
}

impl std::fmt::Debug for CursorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CursorStore")
            .field("open", &self.cursors.len())
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

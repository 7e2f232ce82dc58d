//! Query command handlers.
//!
//! The first page of a result is returned inline. When more rows remain, the
//! rest is handed to the cursor store and the page carries the new cursor id.

use std::sync::Arc;

use docgate_core::{BindVars, Error, QueryResult, Result};
use serde_json::Value;
use tracing::debug;

use crate::cursor::CursorState;
use crate::executor::Services;
use crate::Output;

/// Handle QueryView command.
pub fn query_view(
    s: &Arc<Services>,
    view: String,
    bind_vars: BindVars,
    batch_size: Option<usize>,
) -> Result<Output> {
    let query = resolve_view(s, &view)?;
    debug!(view = %view, "running view");
    run_query(s, &query, &bind_vars, batch_size).map(Output::Query)
}

/// Handle QueryRaw command.
pub fn query_raw(
    s: &Arc<Services>,
    query: String,
    bind_vars: BindVars,
    batch_size: Option<usize>,
) -> Result<Output> {
    if query.trim().is_empty() {
        return Err(Error::InvalidParameter {
            name: "query".to_string(),
            reason: "query text is empty".to_string(),
        });
    }
    run_query(s, &query, &bind_vars, batch_size).map(Output::Query)
}

/// Handle FetchCursor command.
pub fn fetch_cursor(s: &Arc<Services>, cursor_id: String) -> Result<Output> {
    s.cursors.fetch_next(&cursor_id).map(Output::Query)
}

/// Query text registered under `name`.
pub fn resolve_view(s: &Arc<Services>, name: &str) -> Result<String> {
    s.views.query_for(name).ok_or_else(|| Error::ViewNotFound {
        name: name.to_string(),
    })
}

fn run_query(
    s: &Arc<Services>,
    query: &str,
    bind_vars: &BindVars,
    batch_size: Option<usize>,
) -> Result<QueryResult> {
    let page_size = s.options.page_size(batch_size);
    let page = s.backend.query(query, bind_vars, page_size)?;

    if page.has_more && page.continuation.is_none() {
        return Err(Error::Internal {
            reason: "backend reported more rows without a continuation".to_string(),
        });
    }

    let mut results = page.results;
    let overflow: Vec<Value> = if results.len() > page_size {
        results.split_off(page_size)
    } else {
        Vec::new()
    };
    let count = page
        .count
        .unwrap_or((results.len() + overflow.len()) as u64);
    let continuation = page.continuation.filter(|_| page.has_more);

    if overflow.is_empty() && continuation.is_none() {
        return Ok(QueryResult {
            results,
            count,
            has_more: false,
            cursor_id: None,
            stats: page.stats,
        });
    }

    let cursor_id = s.cursors.create(
        CursorState {
            pending: overflow,
            continuation,
        },
        count,
        page.stats.clone(),
        page_size,
    );
    Ok(QueryResult {
        results,
        count,
        has_more: true,
        cursor_id: Some(cursor_id),
        stats: page.stats,
    })
}

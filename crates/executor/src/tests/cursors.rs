//! Cursor lifecycle tests: paging, exhaustion, expiry and concurrent fetches.

use std::collections::HashSet;
use std::thread;
use std::time::Duration;

use docgate_core::{DuplicatePolicy, Error};
use serde_json::{json, Value};

use super::*;

fn keys(rows: &[Value]) -> Vec<String> {
    rows.iter()
        .map(|r| r["_key"].as_str().unwrap().to_string())
        .collect()
}

fn load(executor: &Executor, count: usize) {
    let outcome = save(executor, VERTICES, &vertex_payload(count), DuplicatePolicy::Error, false).unwrap();
    assert_eq!(outcome.created, count as u64);
}

fn list_all(executor: &Executor, batch_size: Option<usize>) -> QueryResult {
    query_view(executor, LIST_ALL, json!({"@collection": VERTICES}), batch_size).unwrap()
}

// =============================================================================
// Paging
// =============================================================================

#[test]
fn test_small_result_is_inline() {
    let (_, executor) = create_test_executor();
    load(&executor, 3);
    let result = list_all(&executor, None);
    assert_eq!(result.results.len(), 3);
    assert_eq!(result.count, 3);
    assert!(!result.has_more);
    assert_eq!(result.cursor_id, None);
    assert!(result.stats.is_object());
    assert_eq!(executor.open_cursors(), 0);
}

#[test]
fn test_two_pages_then_cursor_not_found() {
    let (backend, executor) = create_test_executor();
    load(&executor, 200);

    let first = list_all(&executor, None);
    assert!(first.has_more);
    assert_eq!(first.count, 200);
    assert_eq!(first.results.len(), 100);
    let cursor_id = first.cursor_id.clone().unwrap();

    let second = fetch(&executor, &cursor_id).unwrap();
    assert_eq!(second.count, 200);
    assert_eq!(second.results.len(), 100);
    assert!(!second.has_more);
    assert_eq!(second.cursor_id, None);

    let mut seen: HashSet<String> = keys(&first.results).into_iter().collect();
    seen.extend(keys(&second.results));
    assert_eq!(seen.len(), 200, "pages are disjoint and complete");

    let err = fetch(&executor, &cursor_id).unwrap_err();
    assert_eq!(
        err.to_body(),
        json!({"error": true, "arango_message": "cursor not found"})
    );
    assert_eq!(executor.open_cursors(), 0);
    assert_eq!(backend.open_cursors(), 0);
}

#[test]
fn test_batch_size_controls_page_length() {
    let (_, executor) = create_test_executor();
    load(&executor, 10);

    let first = list_all(&executor, Some(4));
    assert_eq!(first.results.len(), 4);
    let cursor_id = first.cursor_id.unwrap();

    let second = fetch(&executor, &cursor_id).unwrap();
    assert_eq!(second.results.len(), 4);
    assert_eq!(second.cursor_id.as_deref(), Some(cursor_id.as_str()));

    let third = fetch(&executor, &cursor_id).unwrap();
    assert_eq!(third.results.len(), 2);
    assert!(!third.has_more);
}

#[test]
fn test_page_size_is_clamped() {
    let options = ExecutorOptions::default();
    assert_eq!(options.page_size(None), 100);
    assert_eq!(options.page_size(Some(0)), 1);
    assert_eq!(options.page_size(Some(5000)), 1000);
    assert_eq!(options.page_size(Some(7)), 7);
}

#[test]
fn test_unknown_cursor_is_not_found() {
    let (_, executor) = create_test_executor();
    let err = fetch(&executor, "no-such-cursor").unwrap_err();
    assert!(matches!(err, Error::CursorNotFound { ref cursor_id } if cursor_id == "no-such-cursor"));
}

// =============================================================================
// Expiry
// =============================================================================

#[test]
fn test_idle_cursor_expires_and_discards_backend_state() {
    let backend = RecordingBackend::new(false);
    let executor = create_test_executor_with(backend.clone(), short_ttl());
    load(&executor, 250);

    let first = list_all(&executor, None);
    let cursor_id = first.cursor_id.unwrap();
    assert_eq!(backend.inner.open_cursors(), 1);

    thread::sleep(Duration::from_millis(60));
    assert_eq!(executor.sweep_cursors(), 1);
    assert_eq!(executor.open_cursors(), 0);
    assert_eq!(backend.discards(), 1);
    assert_eq!(backend.inner.open_cursors(), 0);

    assert!(matches!(
        fetch(&executor, &cursor_id),
        Err(Error::CursorNotFound { .. })
    ));
}

#[test]
fn test_fetch_after_deadline_is_not_found_without_sweep() {
    let backend = RecordingBackend::new(false);
    let executor = create_test_executor_with(backend.clone(), short_ttl());
    load(&executor, 150);

    let cursor_id = list_all(&executor, None).cursor_id.unwrap();
    thread::sleep(Duration::from_millis(60));
    assert!(matches!(
        fetch(&executor, &cursor_id),
        Err(Error::CursorNotFound { .. })
    ));
    assert_eq!(backend.discards(), 1);
    assert_eq!(executor.open_cursors(), 0);
}

#[test]
fn test_fetch_renews_deadline() {
    let options = ExecutorOptions {
        cursor_ttl: Duration::from_millis(200),
        ..ExecutorOptions::default()
    };
    let executor = create_test_executor_with(memory_backend(), options);
    load(&executor, 30);

    let cursor_id = list_all(&executor, Some(10)).cursor_id.unwrap();
    thread::sleep(Duration::from_millis(120));
    fetch(&executor, &cursor_id).unwrap();
    thread::sleep(Duration::from_millis(120));
    assert_eq!(executor.sweep_cursors(), 0, "second fetch renewed the deadline");
    assert!(!fetch(&executor, &cursor_id).unwrap().has_more);
}

#[test]
fn test_explicit_expire() {
    let backend = RecordingBackend::new(false);
    let executor = create_test_executor_with(backend.clone(), ExecutorOptions::default());
    load(&executor, 150);

    let cursor_id = list_all(&executor, None).cursor_id.unwrap();
    assert!(executor.expire_cursor(&cursor_id));
    assert!(!executor.expire_cursor(&cursor_id));
    assert_eq!(backend.discards(), 1);
    assert!(fetch(&executor, &cursor_id).is_err());
}

#[test]
fn test_backend_failure_retires_cursor() {
    let backend = RecordingBackend::new(true);
    let executor = create_test_executor_with(backend.clone(), ExecutorOptions::default());
    load(&executor, 150);

    let cursor_id = list_all(&executor, None).cursor_id.unwrap();
    let err = fetch(&executor, &cursor_id).unwrap_err();
    assert!(matches!(err, Error::BackendUnavailable { .. }));
    assert!(matches!(
        fetch(&executor, &cursor_id),
        Err(Error::CursorNotFound { .. })
    ));
}

// =============================================================================
// Concurrency
// =============================================================================

#[test]
fn test_parallel_fetches_deliver_each_page_once() {
    let (_, executor) = create_test_executor();
    load(&executor, 50);

    let first = list_all(&executor, Some(10));
    let cursor_id = first.cursor_id.clone().unwrap();

    // 4 pages remain; 8 callers race for them.
    let results: Vec<Result<QueryResult>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| fetch(&executor, &cursor_id)))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let pages: Vec<&QueryResult> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    let misses = results
        .iter()
        .filter(|r| matches!(r, Err(Error::CursorNotFound { .. })))
        .count();
    assert_eq!(pages.len(), 4);
    assert_eq!(misses, 4);
    assert_eq!(pages.iter().filter(|p| !p.has_more).count(), 1);

    let mut seen: HashSet<String> = keys(&first.results).into_iter().collect();
    for page in &pages {
        for key in keys(&page.results) {
            assert!(seen.insert(key), "row delivered twice");
        }
    }
    assert_eq!(seen.len(), 50);
}

#[test]
fn test_independent_cursors_do_not_interfere() {
    let (_, executor) = create_test_executor();
    load(&executor, 20);

    let a = list_all(&executor, Some(5)).cursor_id.unwrap();
    let b = list_all(&executor, Some(5)).cursor_id.unwrap();
    assert_ne!(a, b);

    thread::scope(|scope| {
        for id in [&a, &b] {
            let executor = &executor;
            scope.spawn(move || {
                let mut rows = 5;
                loop {
                    let page = fetch(executor, id).unwrap();
                    rows += page.results.len();
                    if !page.has_more {
                        break;
                    }
                }
                assert_eq!(rows, 20);
            });
        }
    });
    assert_eq!(executor.open_cursors(), 0);
}

//! Ingest followed by paged queries over the memory backend.

use std::collections::HashSet;

use crate::common::*;
use serde_json::{json, Value};

fn keys(rows: &[Value]) -> Vec<String> {
    rows.iter()
        .map(|r| r["_key"].as_str().unwrap().to_string())
        .collect()
}

#[test]
fn ingest_then_page_through_everything() {
    let (backend, executor) = gateway();
    let outcome = save(&executor, VERTICES, &vertex_lines(0..250), DuplicatePolicy::Error).unwrap();
    assert_eq!(outcome.created, 250);
    assert_eq!(backend.len(VERTICES), Some(250));

    let mut page = run_view(&executor, LIST_ALL, VERTICES, None).unwrap();
    let mut seen: HashSet<String> = HashSet::new();
    let mut pages = 0;
    loop {
        pages += 1;
        assert_eq!(page.count, 250);
        for key in keys(&page.results) {
            assert!(seen.insert(key), "row delivered twice");
        }
        match page.cursor_id.clone() {
            Some(cursor_id) => page = fetch(&executor, &cursor_id).unwrap(),
            None => break,
        }
    }
    assert_eq!(pages, 3);
    assert_eq!(seen.len(), 250);
    assert_eq!(executor.open_cursors(), 0);
    assert_eq!(backend.open_cursors(), 0);

    let count = run_view(&executor, COUNT, VERTICES, None).unwrap();
    assert_eq!(count.results, vec![json!(250)]);
}

#[test]
fn update_merges_and_replace_overwrites() {
    let (backend, executor) = gateway();
    save(
        &executor,
        VERTICES,
        r#"{"_key": "a", "name": "first", "meta": {"x": 1, "y": 2}}"#,
        DuplicatePolicy::Error,
    )
    .unwrap();

    let outcome = save(
        &executor,
        VERTICES,
        r#"{"_key": "a", "name": "second", "meta": {"y": 3}}"#,
        DuplicatePolicy::Update,
    )
    .unwrap();
    assert_eq!(outcome.updated, 1);
    let doc = backend.get(VERTICES, "a").unwrap();
    assert_eq!(doc["name"], json!("second"));
    assert_eq!(doc["meta"], json!({"x": 1, "y": 3}));
    assert_eq!(doc["_id"], json!("example_vertices/a"));

    save(
        &executor,
        VERTICES,
        r#"{"_key": "a", "name": "third"}"#,
        DuplicatePolicy::Replace,
    )
    .unwrap();
    let doc = backend.get(VERTICES, "a").unwrap();
    assert_eq!(doc["name"], json!("third"));
    assert!(doc.get("meta").is_none());
}

#[test]
fn ignore_leaves_stored_document_untouched() {
    let (backend, executor) = gateway();
    save(&executor, VERTICES, r#"{"_key": "a", "name": "kept"}"#, DuplicatePolicy::Error).unwrap();
    let outcome = save(
        &executor,
        VERTICES,
        "{\"_key\": \"a\", \"name\": \"dropped\"}\n\n{\"_key\": \"b\"}",
        DuplicatePolicy::Ignore,
    )
    .unwrap();
    assert_eq!(
        (outcome.created, outcome.ignored, outcome.empty, outcome.errors),
        (1, 1, 1, 0)
    );
    assert_eq!(backend.get(VERTICES, "a").unwrap()["name"], json!("kept"));
}

#[test]
fn resubmitted_edges_land_on_the_same_key() {
    let (backend, executor) = gateway();
    let edge = r#"{"_from": "example_vertices/a", "_to": "example_vertices/b", "weight": 1}"#;
    assert_eq!(save(&executor, EDGES, edge, DuplicatePolicy::Error).unwrap().created, 1);

    let outcome = save(&executor, EDGES, edge, DuplicatePolicy::Ignore).unwrap();
    assert_eq!(outcome.ignored, 1);

    let reweighted = r#"{"_from": "example_vertices/a", "_to": "example_vertices/b", "weight": 5}"#;
    assert_eq!(save(&executor, EDGES, reweighted, DuplicatePolicy::Update).unwrap().updated, 1);
    assert_eq!(backend.len(EDGES), Some(1));

    let page = run_view(&executor, LIST_ALL, EDGES, None).unwrap();
    assert_eq!(page.results.len(), 1);
    assert_eq!(page.results[0]["weight"], json!(5));
}

#[test]
fn duplicate_errors_are_detailed_with_line_numbers() {
    let (_, executor) = gateway();
    save(&executor, VERTICES, &vertex_lines(0..2), DuplicatePolicy::Error).unwrap();
    let outcome = save(&executor, VERTICES, &vertex_lines(0..3), DuplicatePolicy::Error).unwrap();
    assert_eq!((outcome.created, outcome.errors), (1, 2));
    assert!(outcome.error);
    let details = outcome.details.unwrap();
    assert_eq!(details.len(), 2);
    assert!(details[0].starts_with("at line 1: "));
    assert!(details[1].starts_with("at line 2: "));
    assert!(details[1].contains("v0001"));
}

#[test]
fn small_pages_keep_totals_stable() {
    let options = ExecutorOptions {
        page_size: 7,
        ..ExecutorOptions::default()
    };
    let (_, executor) = gateway_with(options);
    save(&executor, VERTICES, &vertex_lines(0..20), DuplicatePolicy::Error).unwrap();

    let first = run_view(&executor, LIST_ALL, VERTICES, None).unwrap();
    assert_eq!(first.results.len(), 7);
    let cursor_id = first.cursor_id.unwrap();
    let second = fetch(&executor, &cursor_id).unwrap();
    let third = fetch(&executor, &cursor_id).unwrap();
    assert_eq!(
        (second.results.len(), third.results.len()),
        (7, 6)
    );
    assert!(!third.has_more);
    assert_eq!(third.count, 20);
    assert!(matches!(
        fetch(&executor, &cursor_id),
        Err(Error::CursorNotFound { .. })
    ));
}

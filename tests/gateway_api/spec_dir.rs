//! Spec directory loading from disk.

use crate::common::*;
use serde_json::json;
use tempfile::TempDir;

#[test]
fn repository_specs_load() {
    let specs = SpecRegistry::load_dir(&repo_specs()).unwrap();
    assert_eq!(specs.schema_names(DocumentKind::Vertex), vec![VERTICES]);
    assert_eq!(specs.schema_names(DocumentKind::Edge), vec![EDGES]);
    assert_eq!(specs.view_names(), vec![COUNT, LIST_ALL]);
    assert!(specs
        .query_for(LIST_ALL)
        .unwrap()
        .contains("FOR doc IN @@collection"));
}

#[test]
fn missing_directories_are_empty() {
    let dir = TempDir::new().unwrap();
    let specs = SpecRegistry::load_dir(dir.path()).unwrap();
    assert!(specs.view_names().is_empty());
    assert!(specs.schema_names(DocumentKind::Vertex).is_empty());
}

#[test]
fn other_extensions_are_skipped() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "schemas/vertices/people.json", r#"{"type": "object"}"#);
    write_file(dir.path(), "schemas/vertices/README.md", "# notes");
    write_file(dir.path(), "views/all_people.aql", "FOR p IN people RETURN p");
    write_file(dir.path(), "views/draft.txt", "RETURN 1");

    let specs = SpecRegistry::load_dir(dir.path()).unwrap();
    assert_eq!(specs.schema_names(DocumentKind::Vertex), vec!["people"]);
    assert_eq!(specs.view_names(), vec!["all_people"]);
}

#[test]
fn invalid_schema_json_names_the_file() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "schemas/edges/links.json", "{ not json");
    let err = SpecRegistry::load_dir(dir.path()).unwrap_err();
    assert!(matches!(err, SpecError::InvalidJson { .. }));
    assert!(err.to_string().contains("links.json"));
}

#[test]
fn collection_declared_twice_is_rejected() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "schemas/vertices/things.json", "{}");
    write_file(dir.path(), "schemas/edges/things.json", "{}");
    let err = SpecRegistry::load_dir(dir.path()).unwrap_err();
    assert!(matches!(err, SpecError::DuplicateCollection { ref name } if name == "things"));
}

#[test]
fn loaded_schema_drives_validation() {
    let dir = TempDir::new().unwrap();
    write_file(
        dir.path(),
        "schemas/vertices/people.json",
        &json!({
            "type": "object",
            "required": ["_key", "age"],
            "properties": {"age": {"type": "integer", "minimum": 0}}
        })
        .to_string(),
    );
    let specs = std::sync::Arc::new(SpecRegistry::load_dir(dir.path()).unwrap());
    let backend = std::sync::Arc::new(MemoryBackend::new());
    backend
        .ensure_collection("people", DocumentKind::Vertex)
        .unwrap();
    let executor = Executor::with_specs(backend.clone(), specs, ExecutorOptions::default());

    let err = save(
        &executor,
        "people",
        "{\"_key\": \"a\", \"age\": 3}\n{\"_key\": \"b\", \"age\": -1}",
        DuplicatePolicy::Error,
    )
    .unwrap_err();
    let Error::Validation {
        validator,
        validator_value,
        instance,
        ..
    } = err
    else {
        panic!("expected Validation, got {:?}", err);
    };
    assert_eq!(validator, "minimum");
    assert_eq!(validator_value, json!(0));
    assert_eq!(instance, json!(-1));
    assert_eq!(backend.len("people"), Some(0), "nothing written");
}

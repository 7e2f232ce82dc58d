//! Booting a gateway from a config file and reloading its specs.

use crate::common::*;
use tempfile::TempDir;

fn config_in(dir: &TempDir, body: &str) -> GatewayConfig {
    let path = dir.path().join("docgate.toml");
    std::fs::write(&path, body).unwrap();
    GatewayConfig::from_file(&path).unwrap()
}

#[test]
fn boot_from_config_file() {
    let dir = TempDir::new().unwrap();
    let config = config_in(
        &dir,
        &format!(
            "spec_dir = {:?}\n\n[cursor]\npage_size = 25\nttl_secs = 60\n",
            repo_specs().display().to_string()
        ),
    );
    let executor = build_gateway(&config).unwrap().executor;
    assert_eq!(executor.options().page_size, 25);
    assert_eq!(executor.options().cursor_ttl.as_secs(), 60);

    let outcome = save(&executor, VERTICES, &vertex_lines(0..30), DuplicatePolicy::Error).unwrap();
    assert_eq!(outcome.created, 30);
    let page = run_view(&executor, LIST_ALL, VERTICES, None).unwrap();
    assert_eq!(page.results.len(), 25);
    assert!(page.has_more);
}

#[test]
fn boot_creates_collections_for_every_schema() {
    let dir = TempDir::new().unwrap();
    let specs = dir.path().join("specs");
    write_file(&specs, "schemas/vertices/people.json", r#"{"required": ["_key"]}"#);
    write_file(&specs, "schemas/edges/knows.json", r#"{"required": ["_from", "_to"]}"#);
    let config = GatewayConfig {
        spec_dir: specs,
        ..GatewayConfig::default()
    };
    let executor = build_gateway(&config).unwrap().executor;

    let outcome = save(
        &executor,
        "knows",
        r#"{"_from": "people/a", "_to": "people/b"}"#,
        DuplicatePolicy::Error,
    )
    .unwrap();
    assert_eq!(outcome.created, 1);
    assert_eq!(
        executor.execute(Command::Status).unwrap(),
        Output::Status {
            arangodb_status: BackendStatus::ConnectedAuthorized,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    );
}

#[test]
fn boot_fails_on_invalid_schema() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "schemas/vertices/broken.json", r#"{"type": 12}"#);
    let config = GatewayConfig {
        spec_dir: dir.path().to_path_buf(),
        ..GatewayConfig::default()
    };
    let err = build_gateway(&config).err().unwrap();
    assert!(matches!(err, ServeError::Spec(SpecError::InvalidSchema { .. })));
    assert!(err.to_string().contains("broken"));
}

fn view_names(executor: &Executor) -> Vec<String> {
    match executor.execute(Command::ListViews).unwrap() {
        Output::ViewList(names) => names,
        other => panic!("expected ViewList, got {:?}", other),
    }
}

#[test]
fn reload_merges_unless_reset() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "views/first.aql", "RETURN 1");
    let config = GatewayConfig {
        spec_dir: dir.path().to_path_buf(),
        ..GatewayConfig::default()
    };
    let gateway = build_gateway(&config).unwrap();
    assert_eq!(view_names(&gateway.executor), vec!["first"]);

    std::fs::remove_file(dir.path().join("views/first.aql")).unwrap();
    write_file(dir.path(), "views/second.aql", "RETURN 2");
    let summary = gateway.reloader.reload(false, false).unwrap();
    assert_eq!(summary.views, 2);
    assert_eq!(view_names(&gateway.executor), vec!["first", "second"]);

    let summary = gateway.reloader.reload(true, false).unwrap();
    assert_eq!(summary.views, 1);
    assert_eq!(view_names(&gateway.executor), vec!["second"]);
}

#[test]
fn reload_with_init_collections_makes_new_schema_writable() {
    let dir = TempDir::new().unwrap();
    let config = GatewayConfig {
        spec_dir: dir.path().to_path_buf(),
        ..GatewayConfig::default()
    };
    let gateway = build_gateway(&config).unwrap();
    let err = save(&gateway.executor, "people", r#"{"_key": "a"}"#, DuplicatePolicy::Error)
        .unwrap_err();
    assert!(matches!(err, Error::SchemaNotFound { .. }));

    write_file(dir.path(), "schemas/vertices/people.json", r#"{"required": ["_key"]}"#);
    let summary = gateway.reloader.reload(true, true).unwrap();
    assert_eq!(summary.schemas, 1);
    assert_eq!(summary.collections, 1);

    let outcome = save(&gateway.executor, "people", r#"{"_key": "a"}"#, DuplicatePolicy::Error)
        .unwrap();
    assert_eq!(outcome.created, 1);
}

#[test]
fn failed_reload_keeps_current_specs() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "views/kept.aql", "RETURN 1");
    let config = GatewayConfig {
        spec_dir: dir.path().to_path_buf(),
        ..GatewayConfig::default()
    };
    let gateway = build_gateway(&config).unwrap();

    write_file(dir.path(), "schemas/vertices/broken.json", "{not json");
    let err = gateway.reloader.reload(true, false).unwrap_err();
    assert!(matches!(err, ServeError::Spec(SpecError::InvalidJson { .. })));
    assert_eq!(view_names(&gateway.executor), vec!["kept"]);
}

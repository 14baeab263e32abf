use std::fs;

use assert_matches::assert_matches;

use kira_citegraph::config::{Config, ConfigLoader};
use kira_citegraph::error::KiraError;

#[test]
fn config_file_overrides_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kira-cg.json");
    fs::write(
        &path,
        r#"{
            "schema_version": 1,
            "api": { "mailto": "lab@example.org" },
            "fetch": { "concurrency": 4, "batch_size": 50 },
            "graph": { "n_roots": 10, "half_life": 2.5 }
        }"#,
    )
    .unwrap();

    let resolved = ConfigLoader::resolve(path.to_str()).unwrap();
    assert_eq!(resolved.api.mailto.as_deref(), Some("lab@example.org"));
    assert_eq!(resolved.fetch.concurrency, 4);
    assert_eq!(resolved.fetch.batch_size, 50);
    assert_eq!(resolved.fetch.citers_batch_size, 50);
    assert_eq!(resolved.build.n_roots, 10);
    assert_eq!(resolved.build.n_branches, 25);
    assert_eq!(resolved.build.half_life, 2.5);
}

#[test]
fn explicit_missing_path_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.json");
    let err = ConfigLoader::resolve(path.to_str()).unwrap_err();
    assert_matches!(err, KiraError::MissingConfig(_));
}

#[test]
fn malformed_file_is_a_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kira-cg.json");
    fs::write(&path, "{ not json").unwrap();
    let err = ConfigLoader::read(&path).unwrap_err();
    assert_matches!(err, KiraError::ConfigParse(_));
}

#[test]
fn zero_concurrency_is_rejected() {
    let mut config = Config::default();
    config.fetch.concurrency = Some(0);
    let err = ConfigLoader::resolve_config(config).unwrap_err();
    assert_matches!(err, KiraError::ConfigValue(_));
}

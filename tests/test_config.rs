use request_lens::config::{
    Category, ConfigError, default_config, load_config, load_config_from_path,
};
use std::fs;
use tempfile::tempdir;

#[test]
fn test_defaults_without_file() {
    let config = load_config(None).expect("defaults");
    assert_eq!(config.engine.capacity, 50);
    assert_eq!(config.engine.keep_status_threshold, 400);
    assert_eq!(config.engine.debug_marker, "LOG:");
    assert!(config.filters.exclude.is_none());
    assert!(config.display.show.is_empty());
    assert_eq!(default_config().engine.capacity, 50);
}

#[test]
fn test_partial_file_keeps_other_defaults() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("lens.toml");
    fs::write(
        &path,
        r#"
[engine]
capacity = 5
debug_marker = "DBG:"

[filters]
exclude_path = "^/(assets|health)"
hide_sql = "SCHEMA"

[display]
show = ["sql", "read", "error"]
"#,
    )
    .expect("write config");

    let config = load_config_from_path(&path).expect("valid config");
    assert_eq!(config.engine.capacity, 5);
    assert_eq!(config.engine.keep_status_threshold, 400);
    assert_eq!(config.engine.debug_marker, "DBG:");
    assert_eq!(
        config.filters.exclude_path.as_deref(),
        Some("^/(assets|health)")
    );
    assert_eq!(config.filters.hide_sql.as_deref(), Some("SCHEMA"));
    assert_eq!(
        config.display.show,
        vec![Category::Sql, Category::Read, Category::Error]
    );
}

#[test]
fn test_missing_file_is_read_error() {
    let dir = tempdir().expect("temp dir");
    let err = load_config_from_path(&dir.path().join("absent.toml")).expect_err("missing");
    assert!(matches!(err, ConfigError::Read { .. }));
}

#[test]
fn test_malformed_file_is_parse_error() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[engine]\ncapacity = \"many\"\n").expect("write config");
    let err = load_config_from_path(&path).expect_err("malformed");
    assert!(matches!(err, ConfigError::Parse { .. }));
    assert!(err.to_string().contains("bad.toml"));
}

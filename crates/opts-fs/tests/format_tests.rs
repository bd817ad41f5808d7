use opts_fs::{Error, FeatureFileStore, NormalizedPath};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde::Deserialize;
use serde_json::json;
use std::fs;
use tempfile::TempDir;

#[rstest]
#[case("feature.json", r#"{"options": {"msg": {"greeting": "hi"}}}"#)]
#[case("feature.json5", "{ options: { msg: { greeting: 'hi' } } } // trailing comment")]
#[case("feature.yaml", "options:\n  msg:\n    greeting: hi\n")]
#[case("feature.yml", "options:\n  msg:\n    greeting: hi\n")]
fn test_load_value_each_format(#[case] file_name: &str, #[case] content: &str) {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join(file_name);
    fs::write(&file_path, content).unwrap();

    let value = FeatureFileStore::new()
        .load_value(&NormalizedPath::new(&file_path))
        .unwrap();

    assert_eq!(value, json!({"options": {"msg": {"greeting": "hi"}}}));
}

#[test]
fn test_load_typed() {
    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(rename_all = "camelCase")]
    struct Settings {
        are_configurable_strings_enabled: bool,
    }

    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("config.json");
    fs::write(&file_path, r#"{"areConfigurableStringsEnabled": true}"#).unwrap();

    let settings: Settings = FeatureFileStore::new()
        .load(&NormalizedPath::new(&file_path))
        .unwrap();
    assert!(settings.are_configurable_strings_enabled);
}

#[test]
fn test_invalid_json_reports_path_and_format() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("broken.json");
    fs::write(&file_path, "{\"options\": ").unwrap();

    let err = FeatureFileStore::new()
        .load_value(&NormalizedPath::new(&file_path))
        .unwrap_err();

    match &err {
        Error::ConfigParse { path, format, .. } => {
            assert_eq!(path, &file_path);
            assert_eq!(format, "JSON");
        }
        other => panic!("Expected ConfigParse, got {other:?}"),
    }
}

#[test]
fn test_unsupported_extension() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("README.md");
    fs::write(&file_path, "# docs").unwrap();

    let err = FeatureFileStore::new()
        .load_value(&NormalizedPath::new(&file_path))
        .unwrap_err();
    assert!(matches!(err, Error::UnsupportedFormat { ref extension } if extension == "md"));
}

#[test]
fn test_missing_file_is_io_error() {
    let err = FeatureFileStore::new()
        .load_value(&NormalizedPath::new("/nonexistent/feature.json"))
        .unwrap_err();
    assert!(matches!(err, Error::Io { .. }));
}

//! Integration tests for Settings loading with layered precedence.
//!
//! These tests drive `Settings::load_files` with temp files only, so neither
//! a real global config nor CDKFLOW_* environment variables interfere.

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use cdkflow::application::ApplicationError;
use cdkflow::config::{project_config_path, Settings, DEFAULT_HEADER};
use cdkflow::domain::Format;

#[test]
fn given_no_files_when_load_files_then_defaults() {
    let settings = Settings::load_files(None, None).expect("load defaults");

    assert_eq!(settings, Settings::default());
}

#[test]
fn given_missing_files_when_load_files_then_skipped() {
    let tmp = TempDir::new().unwrap();
    let global = tmp.path().join("nope.toml");

    let settings = Settings::load_files(Some(global.as_path()), None).unwrap();

    assert_eq!(settings, Settings::default());
}

#[test]
fn given_project_file_when_load_files_then_overrides_only_given_fields() {
    // Arrange
    let project = TempDir::new().unwrap();
    let path = project_config_path(project.path());
    fs::write(&path, "format = \"json\"\nstack = \"ops\"\n").unwrap();

    // Act
    let settings = Settings::load_files(None, Some(path.as_path())).unwrap();

    // Assert
    assert_eq!(settings.format, Format::Json);
    assert_eq!(settings.stack, "ops");
    assert_eq!(settings.output_dir, PathBuf::from(".github/workflows"));
    assert_eq!(settings.header.as_deref(), Some(DEFAULT_HEADER));
}

#[test]
fn given_global_and_project_when_load_files_then_project_wins() {
    // Arrange
    let global_dir = TempDir::new().unwrap();
    let global = global_dir.path().join("cdkflow.toml");
    fs::write(&global, "output_dir = \"ci\"\nstack = \"global\"\n").unwrap();

    let project = TempDir::new().unwrap();
    let local = project_config_path(project.path());
    fs::write(&local, "stack = \"local\"\n").unwrap();

    // Act
    let settings = Settings::load_files(Some(global.as_path()), Some(local.as_path())).unwrap();

    // Assert
    assert_eq!(settings.stack, "local");
    assert_eq!(settings.output_dir, PathBuf::from("ci"), "inherited from global");
}

#[test]
fn given_empty_header_when_load_files_then_header_disabled() {
    let project = TempDir::new().unwrap();
    let path = project_config_path(project.path());
    fs::write(&path, "header = \"\"\n").unwrap();

    let settings = Settings::load_files(None, Some(path.as_path())).unwrap();

    assert_eq!(settings.header, None);
}

#[test]
fn given_unknown_key_when_load_files_then_config_error() {
    let project = TempDir::new().unwrap();
    let path = project_config_path(project.path());
    fs::write(&path, "editor = \"vim\"\n").unwrap();

    let result = Settings::load_files(None, Some(path.as_path()));

    assert!(matches!(result, Err(ApplicationError::Config { .. })));
}

#[test]
fn given_invalid_format_when_load_files_then_config_error_names_file() {
    let project = TempDir::new().unwrap();
    let path = project_config_path(project.path());
    fs::write(&path, "format = \"xml\"\n").unwrap();

    let result = Settings::load_files(None, Some(path.as_path()));

    match result {
        Err(ApplicationError::Config { message }) => {
            assert!(message.contains(".cdkflow.toml"), "message: {message}")
        }
        other => panic!("expected config error, got {other:?}"),
    }
}

#[test]
fn given_settings_when_to_toml_then_parses_back() {
    let settings = Settings {
        header: None,
        ..Settings::default()
    };

    let text = settings.to_toml().unwrap();
    let parsed: Settings = toml::from_str(&text).unwrap();

    assert_eq!(parsed.output_dir, settings.output_dir);
    assert_eq!(parsed.format, settings.format);
    assert!(!text.contains("header"));
}

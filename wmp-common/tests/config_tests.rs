//! Tests for configuration loading and root folder resolution
//!
//! Tests that manipulate WMP_ROOT_FOLDER are marked with #[serial] so they
//! never race each other on the process environment.

use serial_test::serial;
use std::env;
use std::path::PathBuf;
use wmp_common::config::{
    default_root_folder, RootFolderInitializer, RootFolderResolver, TomlConfig, DATABASE_FILE,
    ROOT_FOLDER_ENV,
};
use wmp_common::Error;

#[test]
fn test_empty_toml_uses_defaults() {
    let config = TomlConfig::from_toml_str("").unwrap();

    assert_eq!(config, TomlConfig::default());
    assert_eq!(config.rewards.points_per_currency_unit, 10);
    assert_eq!(config.events.capacity, 1000);
    assert_eq!(config.classifier.timeout_secs, 30);
}

#[test]
fn test_partial_toml_keeps_other_defaults() {
    let config = TomlConfig::from_toml_str(
        r#"
        root_folder = "/srv/wmp"

        [classifier]
        base_url = "http://classifier.internal/v1"
        "#,
    )
    .unwrap();

    assert_eq!(config.root_folder, Some(PathBuf::from("/srv/wmp")));
    assert_eq!(config.classifier.base_url, "http://classifier.internal/v1");
    assert_eq!(config.classifier.timeout_secs, 30);
    assert_eq!(config.rewards.points_per_currency_unit, 10);
}

#[test]
fn test_invalid_values_rejected() {
    let result = TomlConfig::from_toml_str("[rewards]\npoints_per_currency_unit = 0\n");
    assert!(matches!(result, Err(Error::Config(_))));

    let result = TomlConfig::from_toml_str("[events]\ncapacity = 0\n");
    assert!(matches!(result, Err(Error::Config(_))));

    let result = TomlConfig::from_toml_str("this is = = not toml");
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_load_or_default_tolerates_missing_and_broken_files() {
    let dir = tempfile::tempdir().unwrap();

    let missing = dir.path().join("absent.toml");
    assert_eq!(TomlConfig::load_or_default(Some(&missing)), TomlConfig::default());

    let broken = dir.path().join("broken.toml");
    std::fs::write(&broken, "[rewards\n").unwrap();
    assert_eq!(TomlConfig::load_or_default(Some(&broken)), TomlConfig::default());

    let good = dir.path().join("good.toml");
    std::fs::write(&good, "[rewards]\npoints_per_currency_unit = 25\n").unwrap();
    let config = TomlConfig::load_or_default(Some(&good));
    assert_eq!(config.rewards.points_per_currency_unit, 25);
}

#[test]
#[serial]
fn test_resolver_priority_order() {
    env::remove_var(ROOT_FOLDER_ENV);

    let toml = TomlConfig::from_toml_str("root_folder = \"/from/toml\"").unwrap();

    // TOML beats compiled default
    let resolved = RootFolderResolver::new("test").with_toml(&toml).resolve();
    assert_eq!(resolved, PathBuf::from("/from/toml"));

    // Environment beats TOML
    env::set_var(ROOT_FOLDER_ENV, "/from/env");
    let resolved = RootFolderResolver::new("test").with_toml(&toml).resolve();
    assert_eq!(resolved, PathBuf::from("/from/env"));

    // Command line beats everything
    let resolved = RootFolderResolver::new("test")
        .with_cli_arg(Some(PathBuf::from("/from/cli")))
        .with_toml(&toml)
        .resolve();
    assert_eq!(resolved, PathBuf::from("/from/cli"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_resolver_falls_back_to_default() {
    env::remove_var(ROOT_FOLDER_ENV);

    let resolved = RootFolderResolver::new("test").resolve();
    assert_eq!(resolved, default_root_folder());
    assert!(!resolved.as_os_str().is_empty());
}

#[test]
fn test_initializer_creates_folder_and_paths() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("nested").join("wmp");

    let initializer = RootFolderInitializer::new(root.clone());
    initializer.ensure_directory_exists().unwrap();

    assert!(root.is_dir());
    assert_eq!(initializer.database_path(), root.join(DATABASE_FILE));
    assert_eq!(initializer.images_path(), root.join("images"));
}

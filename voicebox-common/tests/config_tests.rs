//! Configuration loading and storage preparation tests
//!
//! Tests that touch VOICEBOX_CONFIG are marked #[serial] so they do not race
//! on the process environment.

use serial_test::serial;
use std::env;
use std::fs;
use std::path::PathBuf;
use voicebox_common::config::{
    media_file_path, prepare_storage_dir, TomlConfig, CONFIG_ENV_VAR,
};

#[test]
#[serial]
fn test_explicit_path_wins_over_env() {
    let dir = tempfile::tempdir().unwrap();
    let explicit = dir.path().join("explicit.toml");
    let from_env = dir.path().join("env.toml");
    fs::write(&explicit, "max_retry = 7").unwrap();
    fs::write(&from_env, "max_retry = 9").unwrap();

    env::set_var(CONFIG_ENV_VAR, &from_env);
    let config = TomlConfig::load(Some(&explicit)).unwrap();
    env::remove_var(CONFIG_ENV_VAR);

    assert_eq!(config.max_retry, 7);
}

#[test]
#[serial]
fn test_env_var_used_without_explicit_path() {
    let dir = tempfile::tempdir().unwrap();
    let from_env = dir.path().join("env.toml");
    fs::write(&from_env, "selection_timeout_secs = 12").unwrap();

    env::set_var(CONFIG_ENV_VAR, &from_env);
    let config = TomlConfig::load(None).unwrap();
    env::remove_var(CONFIG_ENV_VAR);

    assert_eq!(config.selection_timeout_secs, 12);
}

#[test]
#[serial]
fn test_missing_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.toml");

    let config = TomlConfig::load(Some(&missing)).unwrap();
    assert_eq!(config.stream_lifetime_cap_secs, 21_600);
}

#[test]
fn test_malformed_file_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let bad = dir.path().join("bad.toml");
    fs::write(&bad, "max_retry = \"three\"").unwrap();

    assert!(TomlConfig::load(Some(&bad)).is_err());
}

#[test]
fn test_prepare_storage_dir_purges_stale_media_only() {
    let dir = tempfile::tempdir().unwrap();
    let storage = dir.path().join("storage");

    // Creates the folder when missing
    assert_eq!(prepare_storage_dir(&storage).unwrap(), 0);
    assert!(storage.is_dir());

    fs::write(media_file_path(&storage, "a"), b"x").unwrap();
    fs::write(media_file_path(&storage, "b"), b"x").unwrap();
    fs::write(storage.join("notes.txt"), b"keep").unwrap();

    assert_eq!(prepare_storage_dir(&storage).unwrap(), 2);
    assert!(!media_file_path(&storage, "a").exists());
    assert!(storage.join("notes.txt").exists());
}

#[test]
fn test_database_path_parsed() {
    let config =
        TomlConfig::from_toml_str(r#"database_path = "/var/lib/voicebox/settings.db""#).unwrap();
    assert_eq!(
        config.database_path,
        Some(PathBuf::from("/var/lib/voicebox/settings.db"))
    );
}

//! `YamlConfigStore` environment overrides.
//!
//! These tests mutate process-wide env vars and are serialized with
//! `serial_test`.

#![allow(clippy::unwrap_used, clippy::expect_used, unsafe_code)]

use metalctl::application::ports::ConfigStore;
use metalctl::infra::config::{API_KEY_ENV, CONFIG_ENV, YamlConfigStore};
use serial_test::serial;
use tempfile::TempDir;

const CONFIG: &str = "metal:
  project_id: proj-1
  api_key: from-file
  hostname: h1
  plan: c3.small.x86
  metro: sv
  operating_system: ubuntu_20_04
";

fn write_config(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, CONFIG).unwrap();
    path
}

#[test]
#[serial]
fn api_key_env_overrides_file() {
    let dir = TempDir::new().unwrap();
    let store = YamlConfigStore::with_path(write_config(&dir));
    // SAFETY: serialized with every other test touching these variables.
    unsafe { std::env::set_var(API_KEY_ENV, "from-env") };
    let config = store.load();
    unsafe { std::env::remove_var(API_KEY_ENV) };

    assert_eq!(config.unwrap().metal.unwrap().api_key, "from-env");
}

#[test]
#[serial]
fn empty_api_key_env_is_ignored() {
    let dir = TempDir::new().unwrap();
    let store = YamlConfigStore::with_path(write_config(&dir));
    unsafe { std::env::set_var(API_KEY_ENV, "") };
    let config = store.load();
    unsafe { std::env::remove_var(API_KEY_ENV) };

    assert_eq!(config.unwrap().metal.unwrap().api_key, "from-file");
}

#[test]
#[serial]
fn api_key_env_creates_metal_section() {
    let dir = TempDir::new().unwrap();
    let store = YamlConfigStore::with_path(dir.path().join("absent.yaml"));
    unsafe { std::env::set_var(API_KEY_ENV, "from-env") };
    let config = store.load();
    unsafe { std::env::remove_var(API_KEY_ENV) };

    let metal = config.unwrap().metal.unwrap();
    assert_eq!(metal.api_key, "from-env");
    assert!(metal.project_id.is_empty());
}

#[test]
#[serial]
fn config_env_selects_file() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir);
    unsafe { std::env::set_var(CONFIG_ENV, &path) };
    let store = YamlConfigStore::default();
    let resolved = store.path();
    let config = store.load();
    unsafe { std::env::remove_var(CONFIG_ENV) };

    assert_eq!(resolved.unwrap(), path);
    assert_eq!(config.unwrap().metal.unwrap().project_id, "proj-1");
}

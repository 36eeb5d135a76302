//! `metalctl device` against temporary config and state files.

#![allow(clippy::expect_used)]

use predicates::prelude::*;

use crate::helpers::{Sandbox, UNREACHABLE_API, metal_config};

#[test]
fn missing_metal_section_is_reported() {
    let sandbox = Sandbox::new();
    sandbox.write_config("ssh:\n  username: root\n");

    sandbox
        .metalctl()
        .args(["device", "status"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Missing 'metal' section"));
}

#[test]
fn status_without_recorded_device_fails() {
    let sandbox = Sandbox::new();
    sandbox.write_config(&metal_config(UNREACHABLE_API));

    sandbox
        .metalctl()
        .args(["device", "status"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No device recorded"));
}

#[test]
fn status_without_recorded_device_json_error() {
    let sandbox = Sandbox::new();
    sandbox.write_config(&metal_config(UNREACHABLE_API));

    let output = sandbox
        .metalctl()
        .args(["device", "status", "--json"])
        .assert()
        .code(1)
        .get_output()
        .stdout
        .clone();
    let value: serde_json::Value = serde_json::from_slice(&output).expect("valid JSON");
    assert_eq!(value["error"], true);
    assert_eq!(value["code"], "not_requested");
}

#[test]
fn create_against_unreachable_service_is_terminal() {
    let sandbox = Sandbox::new();
    sandbox.write_config(&metal_config(UNREACHABLE_API));

    let output = sandbox
        .metalctl()
        .args(["device", "create", "--json"])
        .assert()
        .code(1)
        .get_output()
        .stdout
        .clone();
    let value: serde_json::Value = serde_json::from_slice(&output).expect("valid JSON");
    assert_eq!(value["code"], "provisioning");
    assert!(!sandbox.state_path().exists(), "no id may be recorded");
}

#[test]
fn create_with_incomplete_device_description_fails() {
    let sandbox = Sandbox::new();
    sandbox.write_config(
        "metal:\n  project_id: proj-1\n  api_key: secret\n  hostname: h1\n",
    );

    sandbox
        .metalctl()
        .args(["device", "create"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("metal.plan"));
}

#[test]
fn poll_against_unreachable_service_asks_for_retry() {
    let sandbox = Sandbox::new();
    sandbox
        .write_config(&metal_config(UNREACHABLE_API))
        .write_state(r#"{"device_id":"dev-1"}"#);

    let output = sandbox
        .metalctl()
        .args(["device", "start", "--json"])
        .assert()
        .code(75)
        .get_output()
        .stdout
        .clone();
    let value: serde_json::Value = serde_json::from_slice(&output).expect("valid JSON");
    assert_eq!(value["device_id"], "dev-1");
    assert_eq!(value["state"], "pending");
    assert_eq!(value["retry_after_secs"], 60);
}

#[test]
fn stop_is_not_supported_and_sends_nothing() {
    let sandbox = Sandbox::new();
    sandbox
        .write_config(&metal_config(UNREACHABLE_API))
        .write_state(r#"{"device_id":"dev-1"}"#);

    sandbox
        .metalctl()
        .args(["device", "stop"])
        .assert()
        .success()
        .stdout(predicate::str::contains("not supported"));
}

#[test]
fn api_key_from_environment_satisfies_credentials() {
    let sandbox = Sandbox::new();
    sandbox
        .write_config("metal:\n  project_id: proj-1\n")
        .write_state(r#"{"device_id":"dev-1"}"#);

    sandbox
        .metalctl()
        .env("METALCTL_API_KEY", "from-env")
        .args(["device", "stop", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("not_supported"));
}

#[test]
fn missing_api_key_is_reported() {
    let sandbox = Sandbox::new();
    sandbox.write_config("metal:\n  project_id: proj-1\n");

    sandbox
        .metalctl()
        .args(["device", "stop"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("metal.api_key"));
}

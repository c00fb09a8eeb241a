// SPDX-License-Identifier: Apache-2.0

mod common;

use common::{enclave_installed, run};

#[test]
fn info_json() {
    let output = run(&["info", "--json"]);
    assert!(output.status.success());

    let info: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(info["version"], env!("CARGO_PKG_VERSION"));
    let data = info["data"].as_array().unwrap();
    assert!(data.iter().any(|d| d["name"] == "Platform Enclave"));
}

#[test]
fn collect_without_enclave() {
    if enclave_installed() {
        return;
    }

    let output = run(&["collect", "--json"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("0xf009"), "{}", stderr);
}

#[test]
fn collect_with_timeout_without_enclave() {
    if enclave_installed() {
        return;
    }

    let output = run(&["collect", "--timeout", "10"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn bad_log_target() {
    let output = run(&["--log-target", "syslog", "info"]);
    assert!(!output.status.success());
}

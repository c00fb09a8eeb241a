// SPDX-License-Identifier: Apache-2.0

#![allow(dead_code)]

use process_control::{ChildExt, Output, Timeout};
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;

pub const BIN: &str = env!("CARGO_BIN_EXE_sgx-platform-info");
pub const TIMEOUT_SECS: u64 = 30;

/// Whether the production platform enclave is installed on this host.
pub fn enclave_installed() -> bool {
    Path::new(sgx_platform_info::backend::sgx::ENCLAVE_PATH).exists()
}

/// Run the binary with `args` and return its output.
pub fn run(args: &[&str]) -> Output {
    let child = Command::new(BIN)
        .args(args)
        .env_remove("SGX_PLATFORM_INFO_LOG")
        .env_remove("SGX_PLATFORM_INFO_TIMEOUT")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap_or_else(|e| panic!("failed to run `{}`: {:#?}", BIN, e));

    let output = child
        .with_output_timeout(Duration::from_secs(TIMEOUT_SECS))
        .terminating()
        .wait()
        .unwrap_or_else(|e| panic!("failed to run `{}`: {:#?}", BIN, e))
        .unwrap_or_else(|| panic!("`{}` timed out", BIN));

    assert!(
        output.status.code().is_some(),
        "`{}` terminated by signal {:?}",
        BIN,
        output.status.signal()
    );

    output
}

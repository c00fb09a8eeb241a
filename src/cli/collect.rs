// SPDX-License-Identifier: Apache-2.0

use sgx_platform_info::backend::sgx::SgxLoader;
use sgx_platform_info::{collect_within, get_platform_info, PlatformInfo};

use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::Args;
use log::error;

/// Collect the platform identity from the platform enclave
#[derive(Args, Debug)]
pub struct Options {
    /// Emit JSON rather than human-readable output
    #[clap(short, long)]
    pub(super) json: bool,

    /// Give up if collection takes longer than this many seconds
    #[clap(long, env = "SGX_PLATFORM_INFO_TIMEOUT")]
    pub(super) timeout: Option<u64>,
}

impl Options {
    pub fn execute(self) -> anyhow::Result<ExitCode> {
        let result = match self.timeout {
            Some(secs) => collect_within(SgxLoader::default(), Duration::from_secs(secs)),
            None => get_platform_info(),
        };

        match result {
            Ok(info) => {
                self.print(&info)?;
                Ok(ExitCode::SUCCESS)
            }
            Err(e) => {
                error!("{}", e);
                eprintln!("Error: {}: {}", e.status(), e);
                Ok(ExitCode::FAILURE)
            }
        }
    }

    fn print(&self, info: &PlatformInfo) -> anyhow::Result<()> {
        let hex = info.to_hex();

        if self.json {
            let json = serde_json::to_string_pretty(&hex)
                .context("failed to serialize platform info")?;
            println!("{}", json);
        } else {
            println!("{}", hex);
        }

        Ok(())
    }
}

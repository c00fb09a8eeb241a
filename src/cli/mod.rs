// SPDX-License-Identifier: Apache-2.0

mod collect;
mod info;

use std::process::ExitCode;
use std::str::FromStr;

use anyhow::anyhow;
use clap::{Args, Parser, Subcommand};
use log::info;

/// Collect the SGX platform identity needed for PCK certificate registration
///
/// The platform enclave is created, asked for the PCE identity, the quoting
/// enclave ID, the encrypted PPID and the CPU SVN, and destroyed again.
#[derive(Parser, Debug)]
#[clap(version)]
pub struct Options {
    /// Logging options
    #[clap(flatten)]
    logger: LogOptions,

    /// Subcommands (with their own options)
    #[clap(subcommand)]
    cmd: Subcommands,
}

impl Options {
    pub fn execute(self) -> anyhow::Result<ExitCode> {
        self.logger.init();

        info!("logging initialized!");
        info!("CLI opts: {:?}", self);

        self.cmd.dispatch()
    }
}

/// `sgx-platform-info` subcommands and their options/arguments.
#[derive(Subcommand, Debug)]
enum Subcommands {
    Collect(collect::Options),
    Info(info::Options),
}

impl Subcommands {
    fn dispatch(self) -> anyhow::Result<ExitCode> {
        match self {
            Self::Collect(cmd) => cmd.execute(),
            Self::Info(cmd) => cmd.execute(),
        }
    }
}

/// Common logging / output options
#[derive(Args, Debug)]
pub struct LogOptions {
    /// Increase log verbosity. Pass multiple times for more log output.
    ///
    /// By default we only show error messages. Passing `-v` will show warnings,
    /// `-vv` adds info, `-vvv` for debug, and `-vvvv` for trace.
    #[clap(long = "verbose", short = 'v', parse(from_occurrences))]
    verbosity: u8,

    /// Set fancier logging filters.
    ///
    /// This is equivalent to the `RUST_LOG` environment variable.
    /// For more info, see the `env_logger` crate documentation.
    #[clap(long = "log-filter", env = "SGX_PLATFORM_INFO_LOG")]
    log_filter: Option<String>,

    /// Set log output target ("stderr", "stdout")
    #[clap(long, default_value = "stderr")]
    log_target: LogTarget,
}

impl LogOptions {
    /// Initialize the global logger.
    ///
    /// A logger installed earlier (for example by a test harness) is kept.
    pub fn init(&self) {
        let _ = env_logger::Builder::new()
            .filter_level(self.verbosity_level())
            .parse_filters(self.log_filter.as_deref().unwrap_or_default())
            .target(self.log_target.into())
            .try_init();
    }

    /// Convert the -vvv.. count into a log level.
    fn verbosity_level(&self) -> log::LevelFilter {
        match self.verbosity {
            0 => log::LevelFilter::Error,
            1 => log::LevelFilter::Warn,
            2 => log::LevelFilter::Info,
            3 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}

/// Where log output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
enum LogTarget {
    Stdout,
    Stderr,
}

impl FromStr for LogTarget {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stdout" => Ok(Self::Stdout),
            "stderr" => Ok(Self::Stderr),
            _ => Err(anyhow!("unknown log target {:?}", s)),
        }
    }
}

impl From<LogTarget> for env_logger::Target {
    fn from(t: LogTarget) -> Self {
        match t {
            LogTarget::Stdout => Self::Stdout,
            LogTarget::Stderr => Self::Stderr,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_targets() {
        assert_eq!("STDOUT".parse::<LogTarget>().unwrap(), LogTarget::Stdout);
        assert_eq!("stderr".parse::<LogTarget>().unwrap(), LogTarget::Stderr);
        assert!("syslog".parse::<LogTarget>().is_err());
    }

    #[test]
    fn verbosity() {
        let opts = Options::parse_from(["sgx-platform-info", "-vvv", "info"]);
        assert_eq!(opts.logger.verbosity_level(), log::LevelFilter::Debug);
    }

    #[test]
    fn collect_arguments() {
        let opts = Options::parse_from([
            "sgx-platform-info",
            "collect",
            "--json",
            "--timeout",
            "5",
        ]);
        match opts.cmd {
            Subcommands::Collect(cmd) => {
                assert!(cmd.json);
                assert_eq!(cmd.timeout, Some(5));
            }
            other => panic!("parsed the wrong subcommand: {:?}", other),
        }
    }
}

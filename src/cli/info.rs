// SPDX-License-Identifier: Apache-2.0

use sgx_platform_info::backend::{self, Datum};

use std::fmt::{self, Formatter};
use std::process::ExitCode;

use clap::Args;
use serde::Serialize;

/// Show whether this system can collect platform info
#[derive(Args, Debug)]
pub struct Options {
    /// Emit JSON rather than human-readable output
    #[clap(short, long)]
    json: bool,
}

impl Options {
    pub fn execute(self) -> anyhow::Result<ExitCode> {
        let info = Info::new(backend::data());

        if self.json {
            println!("{}", serde_json::to_string_pretty(&info)?);
        } else {
            println!("{}", info);
        }

        Ok(ExitCode::SUCCESS)
    }
}

#[derive(Serialize)]
struct Info {
    version: &'static str,
    supported: bool,
    data: Vec<Datum>,
}

impl Info {
    fn new(data: Vec<Datum>) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            supported: data.iter().all(|d| d.pass),
            data,
        }
    }
}

impl fmt::Display for Info {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        use colorful::*;

        fn get_icon(is_atty: bool, pass: bool) -> String {
            match (is_atty, pass) {
                (true, true) => "✔".green().to_string(),
                (true, false) => "✗".red().to_string(),
                (false, true) => "✔".into(),
                (false, false) => "✗".into(),
            }
        }

        let is_atty = atty::is(atty::Stream::Stdout);

        writeln!(f, "sgx-platform-info version {}", self.version)?;
        writeln!(
            f,
            "{} Platform info collection",
            get_icon(is_atty, self.supported)
        )?;

        for datum in &self.data {
            write!(f, "  {} {}", get_icon(is_atty, datum.pass), datum.name)?;

            if let Some(ref info) = datum.info {
                write!(f, ": {}", info)?;
            }
            writeln!(f)?;
        }

        for datum in &self.data {
            if let Some(mesg) = datum.mesg.as_ref() {
                writeln!(f, "\n  {}\n", mesg)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dummy() -> Vec<Datum> {
        vec![
            Datum {
                name: "Driver".into(),
                pass: true,
                info: Some("/dev/dummy".into()),
                mesg: None,
            },
            Datum {
                name: " Provisioning".into(),
                pass: false,
                info: None,
                mesg: Some("fix the permissions".into()),
            },
        ]
    }

    #[test]
    fn test_info() {
        Options { json: true }.execute().unwrap();
        Options { json: false }.execute().unwrap();
    }

    #[test]
    fn test_info_json() {
        let info = Info::new(dummy());

        let expected = json!({
            "version": env!("CARGO_PKG_VERSION"),
            "supported": false,
            "data": [
                {
                    "name": "Driver",
                    "pass": true,
                    "info": "/dev/dummy",
                    "mesg": null
                },
                {
                    "name": " Provisioning",
                    "pass": false,
                    "info": null,
                    "mesg": "fix the permissions"
                }
            ]
        });

        assert_eq!(serde_json::to_value(&info).unwrap(), expected);
    }

    #[test]
    fn test_info_display() {
        let text = Info::new(dummy()).to_string();

        assert!(text.contains("Driver: /dev/dummy"));
        assert!(text.contains("fix the permissions"));
    }
}

// SPDX-License-Identifier: Apache-2.0

#![doc = include_str!("../README.md")]
#![deny(clippy::all)]
#![warn(rust_2018_idioms)]

pub mod backend;
pub mod collect;
pub mod error;
pub mod ffi;
pub mod platform;

pub use collect::{collect, collect_within, get_platform_info};
pub use error::{Error, Status};
pub use platform::{CpuSvn, EncryptedPpid, PceInfo, PlatformInfo, PlatformInfoHex, QeId};

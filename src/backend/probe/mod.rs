// SPDX-License-Identifier: Apache-2.0

//! Host capability checks shared by the backends.

pub mod common;

#[cfg(target_arch = "x86_64")]
pub mod x86_64;

// SPDX-License-Identifier: Apache-2.0

use crate::backend::Datum;

use std::arch::x86_64::{CpuidResult, __cpuid_count};

/// A check driven by a single CPUID leaf.
pub struct CpuId {
    pub name: &'static str,
    pub leaf: u32,
    pub subl: u32,
    pub func: fn(CpuidResult) -> (bool, Option<String>),
}

impl CpuId {
    /// Read the vendor string from leaf zero.
    pub fn vendor(res: CpuidResult) -> (bool, Option<String>) {
        let bytes: Vec<u8> = [res.ebx, res.edx, res.ecx]
            .iter()
            .flat_map(|r| r.to_le_bytes())
            .collect();

        let vendor = String::from_utf8_lossy(&bytes).into_owned();
        (vendor == "GenuineIntel", Some(vendor))
    }
}

impl From<&CpuId> for Datum {
    fn from(cpuid: &CpuId) -> Datum {
        // SAFETY: CPUID is available on every x86_64 processor.
        let max = unsafe { __cpuid_count(0, 0) }.eax;

        let (pass, info) = match cpuid.leaf <= max {
            true => (cpuid.func)(unsafe { __cpuid_count(cpuid.leaf, cpuid.subl) }),
            false => (false, None),
        };

        Datum {
            name: cpuid.name.into(),
            pass,
            info,
            mesg: None,
        }
    }
}

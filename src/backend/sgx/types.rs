// SPDX-License-Identifier: Apache-2.0

//! Untrusted-side views of the SGX structures exchanged with the platform
//! enclave and the PCE library.
//!
//! These follow the SDK's `sgx_report_t` and `sgx_target_info_t` rather than
//! the architectural EREPORT layout: the runtime marshals them, so they carry
//! no 512 byte alignment requirement here.
//!
//! Guidelines for this file:
//! * Only use primitive types and arrays for the fields.
//! * Only use u8 arrays for reserved fields.
//! * Document the structs at top-level but never the fields.

#![allow(missing_docs)]

/// Body of an enclave report.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct ReportBody {
    pub cpu_svn: [u8; 16],
    pub misc_select: u32,
    reserved1: [u8; 12],
    pub isv_ext_prod_id: [u8; 16],
    pub attributes: [u64; 2],
    pub mr_enclave: [u8; 32],
    reserved2: [u8; 32],
    pub mr_signer: [u8; 32],
    reserved3: [u8; 32],
    pub config_id: [u8; 64],
    pub isv_prod_id: u16,
    pub isv_svn: u16,
    pub config_svn: u16,
    reserved4: [u8; 42],
    pub isv_family_id: [u8; 16],
    pub report_data: [u8; 64],
}

impl Default for ReportBody {
    fn default() -> Self {
        Self {
            cpu_svn: [0; 16],
            misc_select: 0,
            reserved1: [0; 12],
            isv_ext_prod_id: [0; 16],
            attributes: [0, 0],
            mr_enclave: [0; 32],
            reserved2: [0; 32],
            mr_signer: [0; 32],
            reserved3: [0; 32],
            config_id: [0; 64],
            isv_prod_id: 0,
            isv_svn: 0,
            config_svn: 0,
            reserved4: [0; 42],
            isv_family_id: [0; 16],
            report_data: [0; 64],
        }
    }
}

/// Report produced by the platform enclave for the PCE to verify.
#[derive(Debug, Clone, Copy, Default)]
#[repr(C)]
pub struct Report {
    pub body: ReportBody,
    pub key_id: [u8; 32],
    pub mac: [u8; 16],
}

/// Identity of the enclave a report is targeted at.
///
/// The PCE library fills this in so the platform enclave can produce a report
/// only the PCE can verify.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct TargetInfo {
    pub mr_enclave: [u8; 32],
    pub attributes: [u64; 2],
    reserved1: [u8; 2],
    pub config_svn: u16,
    pub misc_select: u32,
    reserved2: [u8; 8],
    pub config_id: [u8; 64],
    reserved3: [u8; 384],
}

impl Default for TargetInfo {
    fn default() -> Self {
        Self {
            mr_enclave: [0; 32],
            attributes: [0, 0],
            reserved1: [0; 2],
            config_svn: 0,
            misc_select: 0,
            reserved2: [0; 8],
            config_id: [0; 64],
            reserved3: [0; 384],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testaso::testaso;

    testaso! {
        struct ReportBody: 8, 384 => {
            cpu_svn: 0,
            misc_select: 16,
            reserved1: 20,
            isv_ext_prod_id: 32,
            attributes: 48,
            mr_enclave: 64,
            reserved2: 96,
            mr_signer: 128,
            reserved3: 160,
            config_id: 192,
            isv_prod_id: 256,
            isv_svn: 258,
            config_svn: 260,
            reserved4: 262,
            isv_family_id: 304,
            report_data: 320
        }

        struct Report: 8, 432 => {
            body: 0,
            key_id: 384,
            mac: 416
        }

        struct TargetInfo: 8, 512 => {
            mr_enclave: 0,
            attributes: 32,
            reserved1: 48,
            config_svn: 50,
            misc_select: 52,
            reserved2: 56,
            config_id: 64,
            reserved3: 128
        }
    }
}

// SPDX-License-Identifier: Apache-2.0

//! Entry points of the SGX untrusted runtime and the PCE library.
//!
//! Both libraries are opened at run time so the crate builds and its tests
//! run on hosts without the SGX software stack installed.

use super::types::{Report, TargetInfo};
use crate::error::CreateFailure;

use std::os::raw::{c_char, c_int, c_void};

use libloading::Library;
use log::trace;

pub const URTS_LIBRARY: &str = "libsgx_urts.so.2";
pub const PCE_LIBRARY: &str = "libsgx_pce_logic.so.1";

/// Size of an SDK launch token.
pub const LAUNCH_TOKEN_SIZE: usize = 1024;

/// `pce_error_t` value for success.
pub const PCE_SUCCESS: u32 = 0xF000;

pub type EnclaveId = u64;

type CreateEnclave = unsafe extern "C" fn(
    file_name: *const c_char,
    debug: c_int,
    launch_token: *mut [u8; LAUNCH_TOKEN_SIZE],
    launch_token_updated: *mut c_int,
    enclave_id: *mut EnclaveId,
    misc_attr: *mut c_void,
) -> u32;

type DestroyEnclave = unsafe extern "C" fn(enclave_id: EnclaveId) -> u32;

type Ecall = unsafe extern "C" fn(
    enclave_id: EnclaveId,
    index: c_int,
    ocall_table: *const c_void,
    ms: *mut c_void,
) -> u32;

type PceGetTarget = unsafe extern "C" fn(target: *mut TargetInfo, isv_svn: *mut u16) -> u32;

type GetPceInfoWithoutPpid = unsafe extern "C" fn(isv_svn: *mut u16, pce_id: *mut u16) -> u32;

type GetPceInfo = unsafe extern "C" fn(
    report: *const Report,
    public_key: *const u8,
    key_size: u32,
    crypto_suite: u8,
    encrypted_ppid: *mut u8,
    encrypted_ppid_buf_size: u32,
    encrypted_ppid_out_size: *mut u32,
    pce_isv_svn: *mut u16,
    pce_id: *mut u16,
    signature_scheme: *mut u8,
) -> u32;

/// The loaded runtime.
///
/// The function pointers stay valid for as long as the libraries they were
/// resolved from, which this struct owns.
pub struct Runtime {
    pub create_enclave: CreateEnclave,
    pub destroy_enclave: DestroyEnclave,
    pub ecall: Ecall,
    pub pce_get_target: PceGetTarget,
    pub get_pce_info_without_ppid: GetPceInfoWithoutPpid,
    pub get_pce_info: GetPceInfo,

    _urts: Library,
    _pce: Library,
}

fn open(name: &str) -> Result<Library, CreateFailure> {
    trace!("loading {}", name);

    // SAFETY: the SGX libraries run no initialisers with preconditions.
    unsafe { Library::new(name) }
        .map_err(|e| CreateFailure::RuntimeUnavailable(format!("{}: {}", name, e)))
}

fn symbol<T: Copy>(lib: &Library, lib_name: &str, name: &str) -> Result<T, CreateFailure> {
    // SAFETY: each caller pairs a symbol with its C prototype.
    unsafe { lib.get::<T>(name.as_bytes()) }
        .map(|sym| *sym)
        .map_err(|e| CreateFailure::RuntimeUnavailable(format!("{}: {}: {}", lib_name, name, e)))
}

impl Runtime {
    pub fn load() -> Result<Self, CreateFailure> {
        let urts = open(URTS_LIBRARY)?;
        let pce = open(PCE_LIBRARY)?;

        Ok(Self {
            create_enclave: symbol(&urts, URTS_LIBRARY, "sgx_create_enclave")?,
            destroy_enclave: symbol(&urts, URTS_LIBRARY, "sgx_destroy_enclave")?,
            ecall: symbol(&urts, URTS_LIBRARY, "sgx_ecall")?,
            pce_get_target: symbol(&pce, PCE_LIBRARY, "sgx_pce_get_target")?,
            get_pce_info_without_ppid: symbol(&pce, PCE_LIBRARY, "sgx_get_pce_info_without_ppid")?,
            get_pce_info: symbol(&pce, PCE_LIBRARY, "sgx_get_pce_info")?,
            _urts: urts,
            _pce: pce,
        })
    }
}

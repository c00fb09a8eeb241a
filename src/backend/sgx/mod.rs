// SPDX-License-Identifier: Apache-2.0

//! The production backend: the signed platform enclave driven through the
//! SGX untrusted runtime, plus the PCE library.

pub mod types;
mod urts;

use super::probe::common::{device, readable, system_info};
use super::{Datum, Enclave, EncryptedIdentity, Loader, Pce};
use crate::error::{Cause, CreateFailure, SgxStatus};
use crate::platform::{CpuSvn, PceInfo, QeId, MAX_ENCRYPTED_PPID_SIZE, QE_ID_SIZE};
use types::{Report, TargetInfo};
use urts::{EnclaveId, Runtime, LAUNCH_TOKEN_SIZE, PCE_SUCCESS};

use std::ffi::CString;
use std::fs::File;
use std::io;
use std::os::raw::{c_int, c_void};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::ptr;

use log::{debug, warn};

/// Where the signed platform enclave is installed.
pub const ENCLAVE_PATH: &str = "/opt/cc-intel-platform-registration/sgx_platform_enclave.signed.so";

/// `PCE_ALG_RSA_OAEP_3072`: the PPID is encrypted with RSA-3072 OAEP.
const CRYPTO_SUITE: u8 = 1;

/// `PPID_RSA3072_ENCRYPTED`: the certification key type requested.
const CERT_KEY_TYPE: u16 = 3;

/// RSA-3072 modulus followed by a 4 byte public exponent.
const PUBLIC_KEY_SIZE: usize = 384 + 4;

const ECALL_GET_PCE_ENCRYPT_KEY: c_int = 0;
const ECALL_GET_ID: c_int = 1;

#[repr(C)]
struct OcallTable {
    count: usize,
    table: [usize; 1],
}

// The platform enclave makes no OCALLs.
static OCALL_TABLE: OcallTable = OcallTable {
    count: 0,
    table: [0],
};

#[repr(C)]
struct GetPceEncryptKey {
    retval: u32,
    pce_target_info: *const TargetInfo,
    report: *mut Report,
    crypto_suite: u8,
    cert_key_type: u16,
    key_size: u32,
    public_key: *mut u8,
}

#[repr(C)]
struct GetId {
    retval: u32,
    id: *mut [u8; QE_ID_SIZE],
}

fn pce_check(raw: u32) -> Result<(), Cause> {
    match raw {
        PCE_SUCCESS => Ok(()),
        e => Err(Cause::Pce(e)),
    }
}

/// Creates platform enclaves from the signed image.
#[derive(Clone, Debug)]
pub struct SgxLoader {
    image: PathBuf,
}

impl Default for SgxLoader {
    fn default() -> Self {
        Self {
            image: ENCLAVE_PATH.into(),
        }
    }
}

impl SgxLoader {
    #[cfg(test)]
    fn with_image(image: impl Into<PathBuf>) -> Self {
        Self {
            image: image.into(),
        }
    }

    /// Path of the enclave image this loader uses.
    pub fn image(&self) -> &Path {
        &self.image
    }
}

impl Loader for SgxLoader {
    type Enclave = SgxEnclave;

    fn create(&self) -> Result<SgxEnclave, CreateFailure> {
        let missing = |source| CreateFailure::ImageMissing {
            path: self.image.clone(),
            source,
        };

        File::open(&self.image).map_err(missing)?;
        let file_name = CString::new(self.image.as_os_str().as_bytes())
            .map_err(|e| missing(io::Error::new(io::ErrorKind::InvalidInput, e)))?;

        let runtime = Runtime::load()?;

        let mut token = [0u8; LAUNCH_TOKEN_SIZE];
        let mut updated: c_int = 0;
        let mut eid: EnclaveId = 0;

        debug!("creating enclave from {}", self.image.display());

        // SAFETY: every pointer refers to a live local of the expected type.
        let status = unsafe {
            (runtime.create_enclave)(
                file_name.as_ptr(),
                0,
                &mut token,
                &mut updated,
                &mut eid,
                ptr::null_mut(),
            )
        };
        SgxStatus::check(status).map_err(CreateFailure::Sgx)?;

        Ok(SgxEnclave { eid, runtime })
    }

    fn destroy(&self, enclave: SgxEnclave) {
        if enclave.eid == 0 {
            return;
        }

        // SAFETY: `eid` was returned by sgx_create_enclave and is destroyed once.
        let status = unsafe { (enclave.runtime.destroy_enclave)(enclave.eid) };
        if let Err(e) = SgxStatus::check(status) {
            warn!("failed to destroy enclave {:#x}: {}", enclave.eid, e);
        }
    }
}

/// A live platform enclave.
pub struct SgxEnclave {
    eid: EnclaveId,
    runtime: Runtime,
}

impl SgxEnclave {
    /// Invoke an ECALL with its marshalling structure.
    ///
    /// # Safety
    ///
    /// `index` must name the ECALL whose marshalling structure is `T`, and
    /// every pointer in `args` must be valid for that ECALL.
    unsafe fn ecall<T>(&mut self, index: c_int, args: &mut T) -> Result<(), Cause> {
        let table = &OCALL_TABLE as *const OcallTable as *const c_void;
        let status = (self.runtime.ecall)(self.eid, index, table, args as *mut T as *mut c_void);
        SgxStatus::check(status).map_err(Cause::Sgx)
    }
}

impl Enclave for SgxEnclave {
    fn pce_info(&mut self) -> Result<Pce, Cause> {
        let mut target = TargetInfo::default();
        let mut target_svn = 0u16;

        // SAFETY: both out pointers refer to live locals.
        pce_check(unsafe { (self.runtime.pce_get_target)(&mut target, &mut target_svn) })?;

        let mut info = PceInfo::default();
        // SAFETY: both out pointers refer to live fields.
        pce_check(unsafe {
            (self.runtime.get_pce_info_without_ppid)(&mut info.pce_isv_svn, &mut info.pce_id)
        })?;

        Ok(Pce { info, target })
    }

    fn qe_id(&mut self) -> Result<QeId, Cause> {
        let mut id = [0u8; QE_ID_SIZE];
        let mut args = GetId {
            retval: 0,
            id: &mut id,
        };

        // SAFETY: `args` matches ide_get_id and points at a live buffer.
        unsafe { self.ecall(ECALL_GET_ID, &mut args)? };

        match args.retval {
            0 => Ok(QeId(id)),
            e => Err(Cause::Enclave(e)),
        }
    }

    fn encrypted_identity(&mut self, pce: &Pce) -> Result<EncryptedIdentity, Cause> {
        let mut report = Report::default();
        let mut public_key = [0u8; PUBLIC_KEY_SIZE];
        let mut args = GetPceEncryptKey {
            retval: 0,
            pce_target_info: &pce.target,
            report: &mut report,
            crypto_suite: CRYPTO_SUITE,
            cert_key_type: CERT_KEY_TYPE,
            key_size: PUBLIC_KEY_SIZE as u32,
            public_key: public_key.as_mut_ptr(),
        };

        // SAFETY: `args` matches ide_get_pce_encrypt_key and every pointer
        // refers to a live buffer of the declared size.
        unsafe { self.ecall(ECALL_GET_PCE_ENCRYPT_KEY, &mut args)? };
        if args.retval != 0 {
            return Err(Cause::Enclave(args.retval));
        }

        let mut ciphertext = vec![0u8; MAX_ENCRYPTED_PPID_SIZE];
        let mut reported_len = 0u32;
        let mut info = PceInfo::default();
        let mut signature_scheme = 0u8;

        // SAFETY: the buffer size passed matches `ciphertext` and every out
        // pointer refers to a live local.
        pce_check(unsafe {
            (self.runtime.get_pce_info)(
                &report,
                public_key.as_ptr(),
                PUBLIC_KEY_SIZE as u32,
                CRYPTO_SUITE,
                ciphertext.as_mut_ptr(),
                ciphertext.len() as u32,
                &mut reported_len,
                &mut info.pce_isv_svn,
                &mut info.pce_id,
                &mut signature_scheme,
            )
        })?;

        if info != pce.info {
            warn!(
                "PCE identity changed during collection: {:?} -> {:?}",
                pce.info, info
            );
        }

        Ok(EncryptedIdentity {
            ciphertext,
            reported_len,
            cpu_svn: CpuSvn(report.body.cpu_svn),
        })
    }
}

#[cfg(target_arch = "x86_64")]
const CPUIDS: &[super::probe::x86_64::CpuId] = {
    use super::probe::x86_64::CpuId;

    &[
        CpuId {
            name: "CPU",
            leaf: 0x00000000,
            subl: 0x00000000,
            func: CpuId::vendor,
        },
        CpuId {
            name: " SGX Support",
            leaf: 0x00000007,
            subl: 0x00000000,
            func: |res| (res.ebx & (1 << 2) != 0, None),
        },
        CpuId {
            name: "  Version 1",
            leaf: 0x00000012,
            subl: 0x00000000,
            func: |res| (res.eax & (1 << 0) != 0, None),
        },
        CpuId {
            name: "  Version 2",
            leaf: 0x00000012,
            subl: 0x00000000,
            func: |res| (res.eax & (1 << 1) != 0, None),
        },
        CpuId {
            name: "  FLC Support",
            leaf: 0x00000007,
            subl: 0x00000000,
            func: |res| (res.ecx & (1 << 30) != 0, None),
        },
    ]
};

fn library(name: &str) -> Datum {
    // SAFETY: the SGX libraries run no initialisers with preconditions.
    let (pass, info) = match unsafe { libloading::Library::new(name) } {
        Ok(_) => (true, name.to_string()),
        Err(e) => (false, e.to_string()),
    };

    Datum {
        name: format!("Library {}", name),
        pass,
        info: Some(info),
        mesg: (!pass).then(|| "install the Intel SGX DCAP runtime packages".into()),
    }
}

/// Platform support checks for collecting platform info.
pub fn data() -> Vec<Datum> {
    let mut data = vec![system_info()];

    #[cfg(target_arch = "x86_64")]
    data.extend(CPUIDS.iter().map(Datum::from));

    data.push(device(
        "Driver",
        "/dev/sgx_enclave",
        "use a kernel with the in-tree SGX driver (5.11 or newer)",
    ));
    data.push(device(
        " Provisioning",
        "/dev/sgx_provision",
        "add this user to the group owning /dev/sgx_provision",
    ));
    data.push(library(urts::URTS_LIBRARY));
    data.push(library(urts::PCE_LIBRARY));
    data.push(readable(
        "Platform Enclave",
        Path::new(ENCLAVE_PATH),
        "install the signed platform enclave",
    ));

    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use testaso::testaso;

    testaso! {
        struct OcallTable: 8, 16 => {
            count: 0,
            table: 8
        }

        struct GetPceEncryptKey: 8, 40 => {
            retval: 0,
            pce_target_info: 8,
            report: 16,
            crypto_suite: 24,
            cert_key_type: 26,
            key_size: 28,
            public_key: 32
        }

        struct GetId: 8, 16 => {
            retval: 0,
            id: 8
        }
    }

    #[test]
    fn missing_image() {
        let loader = SgxLoader::with_image("/nonexistent/sgx_platform_enclave.signed.so");

        match loader.create() {
            Err(CreateFailure::ImageMissing { path, source }) => {
                assert_eq!(path, loader.image());
                assert_eq!(source.kind(), io::ErrorKind::NotFound);
            }
            Err(e) => panic!("unexpected failure: {}", e),
            Ok(_) => panic!("enclave created from a missing image"),
        }
    }

    #[test]
    fn bogus_image() {
        let image = tempfile::NamedTempFile::new().unwrap();
        let loader = SgxLoader::with_image(image.path());

        match loader.create() {
            Err(CreateFailure::RuntimeUnavailable(_)) | Err(CreateFailure::Sgx(_)) => (),
            Err(e) => panic!("unexpected failure: {}", e),
            Ok(_) => panic!("enclave created from an empty image"),
        }
    }

    #[test]
    fn default_image_path() {
        assert_eq!(SgxLoader::default().image(), Path::new(ENCLAVE_PATH));
    }

    #[test]
    fn probe_names() {
        let data = data();
        assert_eq!(data[0].name, "System Info");
        assert!(data.iter().any(|d| d.name == "Platform Enclave"));
        assert!(data.iter().any(|d| d.name == "Driver"));
    }
}

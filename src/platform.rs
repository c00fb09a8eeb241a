// SPDX-License-Identifier: Apache-2.0

//! The platform provisioning record and its parts.
//!
//! [`PlatformInfo`] is laid out exactly like the `platform_info_t` structure
//! consumed by C callers, so a value can be written straight through the
//! pointer handed to [`crate::ffi::get_platform_info`].

use std::fmt;

use serde::Serialize;

/// Largest encrypted PPID the PCE produces (RSA-3072 OAEP ciphertext).
pub const MAX_ENCRYPTED_PPID_SIZE: usize = 384;

/// Size of the quoting enclave identifier in bytes.
pub const QE_ID_SIZE: usize = 16;

/// Size of the CPU security version in bytes.
pub const CPU_SVN_SIZE: usize = 16;

/// Provisioning Certification Enclave identity.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[repr(C)]
pub struct PceInfo {
    /// Security version of the PCE.
    pub pce_isv_svn: u16,

    /// Identifier of the PCE.
    pub pce_id: u16,
}

/// Quoting enclave identifier, stable for a given platform.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct QeId(pub [u8; QE_ID_SIZE]);

/// Security version of the CPU, as reported in an enclave report.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct CpuSvn(pub [u8; CPU_SVN_SIZE]);

impl AsRef<[u8]> for QeId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for CpuSvn {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Why a ciphertext was refused by [`EncryptedPpid::from_reported`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LengthViolation {
    /// The reported length was zero.
    Empty,

    /// The reported length exceeds [`MAX_ENCRYPTED_PPID_SIZE`].
    TooLong(u32),

    /// The reported length exceeds the bytes actually supplied.
    Truncated {
        /// Length reported by the producer.
        reported: u32,
        /// Bytes actually handed over.
        supplied: usize,
    },
}

impl fmt::Display for LengthViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "reported ciphertext length is zero"),
            Self::TooLong(len) => write!(
                f,
                "reported ciphertext length {} exceeds the {} byte maximum",
                len, MAX_ENCRYPTED_PPID_SIZE
            ),
            Self::Truncated { reported, supplied } => write!(
                f,
                "reported ciphertext length {} exceeds the {} bytes supplied",
                reported, supplied
            ),
        }
    }
}

/// Encrypted Platform Provisioning ID.
///
/// Only the first [`EncryptedPpid::len`] bytes are meaningful; the rest of
/// the buffer is zero.
#[derive(Copy, Clone, PartialEq, Eq)]
#[repr(C)]
pub struct EncryptedPpid {
    len: u32,
    bytes: [u8; MAX_ENCRYPTED_PPID_SIZE],
}

impl Default for EncryptedPpid {
    fn default() -> Self {
        Self {
            len: 0,
            bytes: [0; MAX_ENCRYPTED_PPID_SIZE],
        }
    }
}

impl EncryptedPpid {
    /// Copy the first `reported` bytes of `ciphertext`.
    ///
    /// The length is checked before anything is copied.
    pub fn from_reported(ciphertext: &[u8], reported: u32) -> Result<Self, LengthViolation> {
        let len = reported as usize;

        if len == 0 {
            return Err(LengthViolation::Empty);
        }

        if len > MAX_ENCRYPTED_PPID_SIZE {
            return Err(LengthViolation::TooLong(reported));
        }

        if len > ciphertext.len() {
            return Err(LengthViolation::Truncated {
                reported,
                supplied: ciphertext.len(),
            });
        }

        let mut ppid = Self::default();
        ppid.bytes[..len].copy_from_slice(&ciphertext[..len]);
        ppid.len = reported;
        Ok(ppid)
    }

    /// Number of meaningful ciphertext bytes.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// The meaningful ciphertext bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len()]
    }
}

impl fmt::Debug for EncryptedPpid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptedPpid")
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

/// Everything a registration service needs to fetch a PCK certificate.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(C)]
pub struct PlatformInfo {
    pce_info: PceInfo,
    encrypted_ppid: EncryptedPpid,
    qe_id: QeId,
    cpu_svn: CpuSvn,
}

impl PlatformInfo {
    /// Assemble a record from fully validated parts.
    pub fn new(
        pce_info: PceInfo,
        encrypted_ppid: EncryptedPpid,
        qe_id: QeId,
        cpu_svn: CpuSvn,
    ) -> Self {
        Self {
            pce_info,
            encrypted_ppid,
            qe_id,
            cpu_svn,
        }
    }

    /// PCE security version and identifier.
    pub fn pce_info(&self) -> PceInfo {
        self.pce_info
    }

    /// Encrypted PPID.
    pub fn encrypted_ppid(&self) -> &EncryptedPpid {
        &self.encrypted_ppid
    }

    /// Quoting enclave identifier.
    pub fn qe_id(&self) -> &QeId {
        &self.qe_id
    }

    /// CPU security version.
    pub fn cpu_svn(&self) -> &CpuSvn {
        &self.cpu_svn
    }

    /// Render every field as lowercase hex.
    pub fn to_hex(&self) -> PlatformInfoHex {
        PlatformInfoHex::from(self)
    }
}

/// Hex rendering of the PCE identity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PceInfoHex {
    /// PCE security version, four hex digits.
    pub pce_isv_svn: String,

    /// PCE identifier, four hex digits.
    pub pce_id: String,
}

/// Hex rendering of a [`PlatformInfo`], as sent to registration services.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PlatformInfoHex {
    /// PCE identity.
    pub pce_info: PceInfoHex,

    /// The meaningful bytes of the encrypted PPID.
    pub encrypted_ppid: String,

    /// Quoting enclave identifier.
    pub qe_id: String,

    /// CPU security version.
    pub cpu_svn: String,
}

impl From<&PlatformInfo> for PlatformInfoHex {
    fn from(info: &PlatformInfo) -> Self {
        Self {
            pce_info: PceInfoHex {
                pce_isv_svn: format!("{:04x}", info.pce_info.pce_isv_svn),
                pce_id: format!("{:04x}", info.pce_info.pce_id),
            },
            encrypted_ppid: hex::encode(info.encrypted_ppid.as_bytes()),
            qe_id: hex::encode(info.qe_id),
            cpu_svn: hex::encode(info.cpu_svn),
        }
    }
}

impl fmt::Display for PlatformInfoHex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "PCE ISV SVN:    {}", self.pce_info.pce_isv_svn)?;
        writeln!(f, "PCE ID:         {}", self.pce_info.pce_id)?;
        writeln!(f, "QE ID:          {}", self.qe_id)?;
        writeln!(f, "CPU SVN:        {}", self.cpu_svn)?;
        write!(f, "Encrypted PPID: {}", self.encrypted_ppid)
    }
}

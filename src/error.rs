// SPDX-License-Identifier: Apache-2.0

//! Failure reporting.
//!
//! Every failure carries the step that failed and the underlying cause.
//! [`Error::status`] folds an error into the flat [`Status`] code space that
//! C callers see.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

const STATUS_BASE: u32 = 0x0000_F000;

const fn status(code: u32) -> u32 {
    STATUS_BASE | code
}

/// Wire status codes returned across the C boundary.
///
/// Codes `0xF001` to `0xF008` share their values with the PCE library's own
/// error codes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Status {
    /// All fields were collected.
    Success = 0,
    /// Unexpected error.
    Unexpected = status(0x0001),
    /// A parameter was incorrect.
    InvalidParameter = status(0x0002),
    /// Not enough enclave page cache.
    OutOfEpc = status(0x0003),
    /// The SGX API is unavailable.
    InterfaceUnavailable = status(0x0004),
    /// The SGX report could not be verified.
    InvalidReport = status(0x0005),
    /// A cryptographic operation failed.
    CryptoError = status(0x0006),
    /// Not enough privilege.
    InvalidPrivilege = status(0x0007),
    /// The PCE could not sign at the requested TCB.
    InvalidTcb = status(0x0008),
    /// The platform enclave could not be created.
    EnclaveCreateFail = status(0x0009),
    /// The quoting enclave identifier could not be derived.
    GetQeIdFail = status(0x000A),
    /// The PCE identity could not be retrieved.
    GetPceInfoFail = status(0x000B),
    /// The encrypted PPID could not be retrieved.
    GetEncryptedPpidFail = status(0x000C),
    /// Collection did not finish in time.
    TimedOut = status(0x000D),
}

impl Status {
    const ALL: [Status; 14] = [
        Self::Success,
        Self::Unexpected,
        Self::InvalidParameter,
        Self::OutOfEpc,
        Self::InterfaceUnavailable,
        Self::InvalidReport,
        Self::CryptoError,
        Self::InvalidPrivilege,
        Self::InvalidTcb,
        Self::EnclaveCreateFail,
        Self::GetQeIdFail,
        Self::GetPceInfoFail,
        Self::GetEncryptedPpidFail,
        Self::TimedOut,
    ];

    /// Decode a raw wire value.
    pub fn from_wire(raw: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| *s as u32 == raw)
    }

    /// Human readable description.
    pub fn description(self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::Unexpected => "Unexpected error",
            Self::InvalidParameter => "The parameter is incorrect",
            Self::OutOfEpc => "Not enough memory is available to complete this operation",
            Self::InterfaceUnavailable => "SGX API is unavailable",
            Self::InvalidReport => "SGX report cannot be verified",
            Self::CryptoError => "Cannot decrypt or verify ciphertext",
            Self::InvalidPrivilege => "Not enough privilege to perform the operation",
            Self::InvalidTcb => "PCE could not sign at the requested TCB",
            Self::EnclaveCreateFail => "The Enclave could not be created",
            Self::GetQeIdFail => "The QE ID could not be derived",
            Self::GetPceInfoFail => "The PCE info could not be retrieved",
            Self::GetEncryptedPpidFail => "The encrypted PPID could not be retrieved",
            Self::TimedOut => "Platform info collection timed out",
        }
    }
}

impl From<Status> for u32 {
    fn from(status: Status) -> u32 {
        status as u32
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:#06x})", self.description(), *self as u32)
    }
}

/// A raw `sgx_status_t` returned by the SGX runtime.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SgxStatus(pub u32);

impl SgxStatus {
    /// Turn a raw runtime return value into a `Result`.
    pub fn check(raw: u32) -> Result<(), Self> {
        match raw {
            0 => Ok(()),
            e => Err(Self(e)),
        }
    }

    fn name(self) -> Option<&'static str> {
        Some(match self.0 {
            0x0001 => "SGX_ERROR_UNEXPECTED",
            0x0002 => "SGX_ERROR_INVALID_PARAMETER",
            0x0003 => "SGX_ERROR_OUT_OF_MEMORY",
            0x0004 => "SGX_ERROR_ENCLAVE_LOST",
            0x0005 => "SGX_ERROR_INVALID_STATE",
            0x0008 => "SGX_ERROR_FEATURE_NOT_SUPPORTED",
            0x1001 => "SGX_ERROR_INVALID_FUNCTION",
            0x1003 => "SGX_ERROR_OUT_OF_TCS",
            0x1006 => "SGX_ERROR_ENCLAVE_CRASHED",
            0x2001 => "SGX_ERROR_INVALID_ENCLAVE",
            0x2002 => "SGX_ERROR_INVALID_ENCLAVE_ID",
            0x2003 => "SGX_ERROR_INVALID_SIGNATURE",
            0x2005 => "SGX_ERROR_OUT_OF_EPC",
            0x2006 => "SGX_ERROR_NO_DEVICE",
            0x2009 => "SGX_ERROR_INVALID_METADATA",
            0x200c => "SGX_ERROR_DEVICE_BUSY",
            0x200f => "SGX_ERROR_ENCLAVE_FILE_ACCESS",
            0x2011 => "SGX_ERROR_INVALID_LAUNCH_TOKEN",
            _ => return None,
        })
    }
}

impl fmt::Display for SgxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} ({:#06x})", name, self.0),
            None => write!(f, "sgx status {:#06x}", self.0),
        }
    }
}

/// Why the platform enclave could not be created.
#[derive(Debug)]
pub enum CreateFailure {
    /// The signed enclave image could not be opened.
    ImageMissing {
        /// Where the image was expected.
        path: PathBuf,
        /// Why opening it failed.
        source: io::Error,
    },

    /// The SGX runtime libraries could not be loaded.
    RuntimeUnavailable(String),

    /// The runtime refused to create the enclave.
    Sgx(SgxStatus),
}

impl fmt::Display for CreateFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ImageMissing { path, source } => {
                write!(f, "enclave image {} unavailable: {}", path.display(), source)
            }
            Self::RuntimeUnavailable(e) => write!(f, "SGX runtime unavailable: {}", e),
            Self::Sgx(status) => write!(f, "sgx_create_enclave failed: {}", status),
        }
    }
}

impl std::error::Error for CreateFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ImageMissing { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Underlying cause of a failed enclave or PCE operation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Cause {
    /// The SGX runtime itself failed (for example the ECALL could not be made).
    Sgx(SgxStatus),

    /// The PCE library returned a `pce_error_t` other than success.
    Pce(u32),

    /// The enclave function ran but returned a nonzero status.
    Enclave(u32),
}

impl fmt::Display for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sgx(status) => write!(f, "{}", status),
            Self::Pce(raw) => match Status::from_wire(*raw) {
                Some(status) => write!(f, "PCE error: {}", status),
                None => write!(f, "PCE error {:#06x}", raw),
            },
            Self::Enclave(raw) => write!(f, "enclave returned {:#x}", raw),
        }
    }
}

impl std::error::Error for Cause {}

/// Enclave operations whose output is validated before use.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Operation {
    /// Obtaining the encrypted PPID and CPU SVN.
    EncryptedIdentity,
}

impl Operation {
    fn status(self) -> Status {
        match self {
            Self::EncryptedIdentity => Status::GetEncryptedPpidFail,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::EncryptedIdentity => "get encrypted PPID",
        })
    }
}

/// Error returned when platform info cannot be collected.
#[derive(Debug)]
pub enum Error {
    /// The platform enclave could not be created.
    EnclaveCreate(CreateFailure),

    /// The PCE identity could not be read.
    PceInfo(Cause),

    /// The quoting enclave identifier could not be derived.
    QeId(Cause),

    /// The encrypted PPID and CPU SVN could not be obtained.
    Identity(Cause),

    /// An operation reported success but handed back malformed output.
    ContractViolation {
        /// The operation that misbehaved.
        operation: Operation,
        /// What was wrong with its output.
        detail: String,
    },

    /// Collection did not complete within the allotted time.
    TimedOut(Duration),

    /// The collection worker could not be run to completion.
    Worker(String),

    /// The caller passed an unusable argument.
    InvalidParameter,
}

impl Error {
    /// The wire status code reported for this error.
    pub fn status(&self) -> Status {
        match self {
            Self::EnclaveCreate(_) => Status::EnclaveCreateFail,
            Self::PceInfo(_) => Status::GetPceInfoFail,
            Self::QeId(_) => Status::GetQeIdFail,
            Self::Identity(_) => Status::GetEncryptedPpidFail,
            Self::ContractViolation { operation, .. } => operation.status(),
            Self::TimedOut(_) => Status::TimedOut,
            Self::Worker(_) => Status::Unexpected,
            Self::InvalidParameter => Status::InvalidParameter,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EnclaveCreate(e) => write!(f, "failed to create platform enclave: {}", e),
            Self::PceInfo(e) => write!(f, "failed to get PCE info: {}", e),
            Self::QeId(e) => write!(f, "failed to get QE ID: {}", e),
            Self::Identity(e) => write!(f, "failed to get encrypted PPID: {}", e),
            Self::ContractViolation { operation, detail } => {
                write!(f, "{} returned malformed output: {}", operation, detail)
            }
            Self::TimedOut(after) => {
                write!(f, "platform info collection timed out after {:?}", after)
            }
            Self::Worker(e) => write!(f, "platform info worker failed: {}", e),
            Self::InvalidParameter => write!(f, "invalid parameter"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::EnclaveCreate(e) => Some(e),
            Self::PceInfo(e) | Self::QeId(e) | Self::Identity(e) => Some(e),
            _ => None,
        }
    }
}

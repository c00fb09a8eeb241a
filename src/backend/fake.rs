// SPDX-License-Identifier: Apache-2.0

//! A deterministic backend for exercising collection without SGX hardware.
//!
//! Every call is recorded in a shared [`Journal`], and a single [`Fault`]
//! can be injected per loader.

use super::{Enclave, EncryptedIdentity, Loader, Pce};
use crate::error::{Cause, CreateFailure};
use crate::platform::{CpuSvn, PceInfo, QeId, CPU_SVN_SIZE, MAX_ENCRYPTED_PPID_SIZE, QE_ID_SIZE};

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

/// PCE library status returned for an injected PCE failure.
pub const FAULT_STATUS: u32 = 0xF004;

/// Enclave status returned for an injected enclave failure.
pub const ENCLAVE_FAULT_STATUS: u32 = 1;

/// An operation observed by the fake.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Call {
    Create(u64),
    PceInfo(u64),
    QeId(u64),
    EncryptedIdentity(u64),
    Destroy(u64),
}

impl Call {
    /// The enclave instance the call was made against.
    pub fn instance(&self) -> u64 {
        match *self {
            Self::Create(id)
            | Self::PceInfo(id)
            | Self::QeId(id)
            | Self::EncryptedIdentity(id)
            | Self::Destroy(id) => id,
        }
    }
}

/// The failure to inject.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum Fault {
    #[default]
    None,
    /// The enclave image is missing.
    Create,
    PceInfo,
    QeId,
    EncryptedIdentity,
    /// `encrypted_identity` succeeds but reports this ciphertext length.
    ReportedLength(u32),
    /// Every enclave operation stalls for this long before answering.
    Stall(Duration),
}

/// Shared record of every call made against a [`FakeLoader`].
#[derive(Clone, Debug, Default)]
pub struct Journal(Arc<Mutex<Vec<Call>>>);

impl Journal {
    fn lock(&self) -> MutexGuard<'_, Vec<Call>> {
        // A panicking test thread must not hide the calls it made.
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, call: Call) {
        self.lock().push(call);
    }

    /// Every call so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.lock().clone()
    }

    /// Number of calls matching `pred`.
    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.lock().iter().filter(|c| pred(c)).count()
    }

    /// Calls made against a single enclave instance.
    pub fn instance(&self, id: u64) -> Vec<Call> {
        self.lock()
            .iter()
            .copied()
            .filter(|c| c.instance() == id)
            .collect()
    }
}

/// The platform identity the fake reports.
pub const PCE_INFO: PceInfo = PceInfo {
    pce_isv_svn: 0x000d,
    pce_id: 0x0000,
};

/// The quoting enclave identifier the fake reports.
pub const QE_ID: QeId = QeId([0x5a; QE_ID_SIZE]);

/// The CPU security version the fake reports.
pub const CPU_SVN: CpuSvn = CpuSvn([0x0e; CPU_SVN_SIZE]);

#[derive(Debug, Default)]
pub struct FakeLoader {
    fault: Fault,
    journal: Journal,
    instances: AtomicU64,
}

impl FakeLoader {
    pub fn new(fault: Fault) -> Self {
        Self {
            fault,
            ..Self::default()
        }
    }

    /// A handle on this loader's call record.
    pub fn journal(&self) -> Journal {
        self.journal.clone()
    }
}

impl Loader for FakeLoader {
    type Enclave = FakeEnclave;

    fn create(&self) -> Result<FakeEnclave, CreateFailure> {
        let id = self.instances.fetch_add(1, Ordering::SeqCst) + 1;
        self.journal.record(Call::Create(id));

        if self.fault == Fault::Create {
            return Err(CreateFailure::ImageMissing {
                path: super::sgx::ENCLAVE_PATH.into(),
                source: io::ErrorKind::NotFound.into(),
            });
        }

        Ok(FakeEnclave {
            id,
            fault: self.fault,
            journal: self.journal.clone(),
            state: id,
        })
    }

    fn destroy(&self, enclave: FakeEnclave) {
        self.journal.record(Call::Destroy(enclave.id));
    }
}

pub struct FakeEnclave {
    id: u64,
    fault: Fault,
    journal: Journal,
    state: u64,
}

impl FakeEnclave {
    fn enter(&self, call: Call, fault: Fault, cause: Cause) -> Result<(), Cause> {
        self.journal.record(call);

        if let Fault::Stall(delay) = self.fault {
            thread::sleep(delay);
        }

        match self.fault == fault {
            true => Err(cause),
            false => Ok(()),
        }
    }

    // xorshift64*: ciphertext must differ on every call, like a real
    // randomized encryption, while staying reproducible across runs.
    fn next(&mut self) -> u64 {
        self.state ^= self.state >> 12;
        self.state ^= self.state << 25;
        self.state ^= self.state >> 27;
        self.state.wrapping_mul(0x2545_f491_4f6c_dd1d)
    }
}

impl Enclave for FakeEnclave {
    fn pce_info(&mut self) -> Result<Pce, Cause> {
        self.enter(Call::PceInfo(self.id), Fault::PceInfo, Cause::Pce(FAULT_STATUS))?;

        Ok(Pce {
            info: PCE_INFO,
            ..Pce::default()
        })
    }

    fn qe_id(&mut self) -> Result<QeId, Cause> {
        let cause = Cause::Enclave(ENCLAVE_FAULT_STATUS);
        self.enter(Call::QeId(self.id), Fault::QeId, cause)?;
        Ok(QE_ID)
    }

    fn encrypted_identity(&mut self, pce: &Pce) -> Result<EncryptedIdentity, Cause> {
        let cause = Cause::Enclave(ENCLAVE_FAULT_STATUS);
        self.enter(Call::EncryptedIdentity(self.id), Fault::EncryptedIdentity, cause)?;

        if pce.info != PCE_INFO {
            return Err(Cause::Pce(0xF005));
        }

        let reported_len = match self.fault {
            Fault::ReportedLength(len) => len,
            _ => MAX_ENCRYPTED_PPID_SIZE as u32,
        };

        let len = (reported_len as usize).max(MAX_ENCRYPTED_PPID_SIZE);
        let mut ciphertext = Vec::with_capacity(len);
        while ciphertext.len() < len {
            ciphertext.extend_from_slice(&self.next().to_le_bytes());
        }
        ciphertext.truncate(len);

        Ok(EncryptedIdentity {
            ciphertext,
            reported_len,
            cpu_svn: CPU_SVN,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_ciphertext() {
        let loader = FakeLoader::default();
        let mut enclave = loader.create().unwrap();
        let pce = enclave.pce_info().unwrap();

        let a = enclave.encrypted_identity(&pce).unwrap();
        let b = enclave.encrypted_identity(&pce).unwrap();
        assert_ne!(a.ciphertext, b.ciphertext);
        assert_eq!(a.cpu_svn, b.cpu_svn);

        loader.destroy(enclave);
    }

    #[test]
    fn journal_records_instances() {
        let loader = FakeLoader::default();
        let journal = loader.journal();

        let first = loader.create().unwrap();
        let mut second = loader.create().unwrap();
        second.qe_id().unwrap();
        loader.destroy(first);
        loader.destroy(second);

        assert_eq!(journal.instance(1), vec![Call::Create(1), Call::Destroy(1)]);
        assert_eq!(
            journal.instance(2),
            vec![Call::Create(2), Call::QeId(2), Call::Destroy(2)]
        );
    }

    #[test]
    fn injected_fault() {
        let loader = FakeLoader::new(Fault::QeId);
        let mut enclave = loader.create().unwrap();

        assert!(enclave.pce_info().is_ok());
        assert_eq!(enclave.qe_id(), Err(Cause::Enclave(ENCLAVE_FAULT_STATUS)));

        loader.destroy(enclave);
    }

    #[test]
    fn fault_causes_match_their_source() {
        let loader = FakeLoader::new(Fault::PceInfo);
        let mut enclave = loader.create().unwrap();
        assert_eq!(enclave.pce_info().unwrap_err(), Cause::Pce(FAULT_STATUS));
        loader.destroy(enclave);

        let loader = FakeLoader::new(Fault::EncryptedIdentity);
        let mut enclave = loader.create().unwrap();
        let pce = enclave.pce_info().unwrap();
        assert_eq!(
            enclave.encrypted_identity(&pce).unwrap_err(),
            Cause::Enclave(ENCLAVE_FAULT_STATUS)
        );
        loader.destroy(enclave);
    }
}

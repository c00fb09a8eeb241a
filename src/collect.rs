// SPDX-License-Identifier: Apache-2.0

//! Collection of the platform record.
//!
//! Each collection creates its own enclave, walks it through
//! `PCE info -> QE ID -> encrypted identity` and destroys it before
//! returning. Nothing is shared between collections, so concurrent callers
//! need no coordination.

use crate::backend::sgx::SgxLoader;
use crate::backend::{Enclave, Loader, Scoped};
use crate::error::{Error, Operation};
use crate::platform::{EncryptedPpid, PlatformInfo};

use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use log::{debug, error, warn};

/// Collect the platform record using `loader`.
///
/// The first failing step aborts the collection; the enclave is destroyed
/// on every path once it was created.
pub fn collect<L: Loader>(loader: &L) -> Result<PlatformInfo, Error> {
    debug!("creating platform enclave");
    let mut enclave = Scoped::create(loader).map_err(Error::EnclaveCreate)?;

    let pce = enclave.pce_info().map_err(Error::PceInfo)?;
    debug!(
        "got PCE info: isv_svn={:#06x} pce_id={:#06x}",
        pce.info.pce_isv_svn, pce.info.pce_id
    );

    let qe_id = enclave.qe_id().map_err(Error::QeId)?;
    debug!("got QE ID");

    let identity = enclave.encrypted_identity(&pce).map_err(Error::Identity)?;

    let reported = identity.reported_len;
    let encrypted_ppid = EncryptedPpid::from_reported(&identity.ciphertext, reported)
        .map_err(|violation| {
            error!("encrypted identity rejected: {}", violation);
            Error::ContractViolation {
                operation: Operation::EncryptedIdentity,
                detail: violation.to_string(),
            }
        })?;
    debug!("got encrypted PPID ({} bytes)", encrypted_ppid.len());

    Ok(PlatformInfo::new(pce.info, encrypted_ppid, qe_id, identity.cpu_svn))
}

/// Collect the platform record from the installed platform enclave.
pub fn get_platform_info() -> Result<PlatformInfo, Error> {
    collect(&SgxLoader::default())
}

/// Like [`collect`], but give up after `timeout`.
///
/// On timeout the worker thread is abandoned: it finishes, destroys its
/// enclave and discards its result in the background.
pub fn collect_within<L>(loader: L, timeout: Duration) -> Result<PlatformInfo, Error>
where
    L: Loader + Send + 'static,
{
    let (tx, rx) = mpsc::channel();

    thread::Builder::new()
        .name("platform-info".into())
        .spawn(move || {
            // The receiver is gone if the caller already timed out.
            let _ = tx.send(collect(&loader));
        })
        .map_err(|e| Error::Worker(e.to_string()))?;

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => {
            warn!("platform info collection timed out after {:?}", timeout);
            Err(Error::TimedOut(timeout))
        }
        Err(RecvTimeoutError::Disconnected) => {
            Err(Error::Worker("worker exited without a result".into()))
        }
    }
}

// SPDX-License-Identifier: Apache-2.0

//! Enclave backends.
//!
//! A [`Loader`] creates and destroys enclave instances; an [`Enclave`]
//! performs the three identity operations against one instance. The
//! production adapter lives in [`sgx`]; [`fake`] provides a deterministic,
//! fault-injecting stand-in.

pub mod fake;
pub mod sgx;

mod probe;

use std::mem::ManuallyDrop;
use std::ops::{Deref, DerefMut};

use log::debug;
use serde::Serialize;

use crate::error::{Cause, CreateFailure};
use crate::platform::{CpuSvn, PceInfo, QeId};

use self::sgx::types::TargetInfo;

pub trait Loader {
    /// The live enclave instance this loader hands out.
    type Enclave: Enclave;

    /// Create a new enclave instance.
    fn create(&self) -> Result<Self::Enclave, CreateFailure>;

    /// Release an enclave instance.
    ///
    /// Destruction cannot be reported to the caller; failures are logged.
    fn destroy(&self, enclave: Self::Enclave);
}

pub trait Enclave {
    /// Read the PCE identity and report target.
    fn pce_info(&mut self) -> Result<Pce, Cause>;

    /// Derive the quoting enclave identifier.
    fn qe_id(&mut self) -> Result<QeId, Cause>;

    /// Produce the encrypted PPID and the CPU SVN.
    ///
    /// `pce` must come from a successful [`Enclave::pce_info`] on this
    /// instance.
    fn encrypted_identity(&mut self, pce: &Pce) -> Result<EncryptedIdentity, Cause>;
}

/// PCE identity together with the target info reports must be bound to.
///
/// The target is only meaningful to the SGX backend and stays crate-private.
#[derive(Copy, Clone, Debug, Default)]
pub struct Pce {
    pub info: PceInfo,
    pub(crate) target: TargetInfo,
}

/// Raw output of [`Enclave::encrypted_identity`].
///
/// `reported_len` is untrusted until checked against `ciphertext`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncryptedIdentity {
    pub ciphertext: Vec<u8>,
    pub reported_len: u32,
    pub cpu_svn: CpuSvn,
}

/// An enclave instance that is destroyed when dropped.
///
/// Every successful [`Scoped::create`] is paired with exactly one
/// [`Loader::destroy`], on every exit path.
pub struct Scoped<'a, L: Loader> {
    loader: &'a L,
    enclave: ManuallyDrop<L::Enclave>,
}

impl<'a, L: Loader> Scoped<'a, L> {
    pub fn create(loader: &'a L) -> Result<Self, CreateFailure> {
        let enclave = loader.create()?;
        debug!("enclave created");

        Ok(Self {
            loader,
            enclave: ManuallyDrop::new(enclave),
        })
    }
}

impl<L: Loader> Deref for Scoped<'_, L> {
    type Target = L::Enclave;

    fn deref(&self) -> &Self::Target {
        &self.enclave
    }
}

impl<L: Loader> DerefMut for Scoped<'_, L> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.enclave
    }
}

impl<L: Loader> Drop for Scoped<'_, L> {
    fn drop(&mut self) {
        // SAFETY: `enclave` is taken exactly once and never touched again.
        let enclave = unsafe { ManuallyDrop::take(&mut self.enclave) };
        self.loader.destroy(enclave);
        debug!("enclave destroyed");
    }
}

/// A single platform support check.
#[derive(Clone, Debug, Serialize)]
pub struct Datum {
    /// The name of this datum.
    pub name: String,

    /// Whether the datum indicates support for the platform or not.
    pub pass: bool,

    /// Short additional information to display to the user.
    pub info: Option<String>,

    /// Longer explanatory message on how to resolve problems.
    pub mesg: Option<String>,
}

/// Run every platform support check.
pub fn data() -> Vec<Datum> {
    sgx::data()
}

// SPDX-License-Identifier: Apache-2.0

//! C entry point, linkable from the static library.

use crate::backend::sgx::SgxLoader;
use crate::backend::Loader;
use crate::collect::collect;
use crate::error::{Error, Status};
use crate::platform::PlatformInfo;

use std::panic::{self, AssertUnwindSafe};

use log::error;

/// Collect with `loader` and write the record through `out`.
///
/// Returns `0` on success or one of the `0xF0xx` codes of [`Status`].
/// `out` is written only on success; on failure it is left untouched.
///
/// # Safety
///
/// `out` must be null or valid for writing a [`PlatformInfo`].
pub unsafe fn fill<L: Loader>(loader: &L, out: *mut PlatformInfo) -> u32 {
    if out.is_null() {
        return Error::InvalidParameter.status().into();
    }

    let status = match panic::catch_unwind(AssertUnwindSafe(|| collect(loader))) {
        Ok(Ok(info)) => {
            out.write(info);
            Status::Success
        }
        Ok(Err(e)) => {
            error!("{}", e);
            e.status()
        }
        Err(_) => {
            error!("platform info collection panicked");
            Status::Unexpected
        }
    };

    status.into()
}

/// Fill `out` with the platform record from the installed platform enclave.
///
/// # Safety
///
/// `out` must be null or valid for writing a `platform_info_t`.
#[no_mangle]
pub unsafe extern "C" fn get_platform_info(out: *mut PlatformInfo) -> u32 {
    fill(&SgxLoader::default(), out)
}

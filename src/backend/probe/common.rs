// SPDX-License-Identifier: Apache-2.0

use crate::backend::Datum;

use std::ffi::CStr;
use std::fs::OpenOptions;
use std::io;
use std::mem::MaybeUninit;
use std::os::raw::c_char;
use std::path::Path;

fn field(raw: &[c_char]) -> String {
    // SAFETY: uname() NUL terminates every field within its buffer.
    unsafe { CStr::from_ptr(raw.as_ptr()) }
        .to_string_lossy()
        .into_owned()
}

fn uname() -> io::Result<libc::utsname> {
    let mut buf = MaybeUninit::<libc::utsname>::uninit();

    // SAFETY: `buf` is a valid out pointer for the duration of the call.
    match unsafe { libc::uname(buf.as_mut_ptr()) } {
        0 => Ok(unsafe { buf.assume_init() }),
        _ => Err(io::Error::last_os_error()),
    }
}

pub fn system_info() -> Datum {
    let info = match uname() {
        Ok(uts) => format!(
            "{} {} {} {}",
            field(&uts.sysname),
            field(&uts.release),
            field(&uts.version),
            field(&uts.machine),
        ),
        Err(e) => format!("[{}]", e),
    };

    Datum {
        name: "System Info".into(),
        pass: true,
        info: Some(info),
        mesg: None,
    }
}

/// Check that a device node can be opened for reading and writing.
pub fn device(name: &str, path: &str, mesg: &str) -> Datum {
    let (pass, info) = match OpenOptions::new().read(true).write(true).open(path) {
        Ok(_) => (true, path.to_string()),
        Err(e) => (false, format!("{} ({})", path, e)),
    };

    Datum {
        name: name.into(),
        pass,
        info: Some(info),
        mesg: (!pass).then(|| mesg.to_string()),
    }
}

/// Check that a file exists and is readable.
pub fn readable(name: &str, path: &Path, mesg: &str) -> Datum {
    let pass = std::fs::File::open(path).is_ok();

    Datum {
        name: name.into(),
        pass,
        info: Some(path.display().to_string()),
        mesg: (!pass).then(|| mesg.to_string()),
    }
}

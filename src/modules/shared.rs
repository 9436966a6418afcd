// Copyright (c) 2024 Daniel Bergløv
// 
// Permission is hereby granted, free of charge, to any person obtaining a 
// copy of this software and associated documentation files (the "Software"), 
// to deal in the Software without restriction, including without limitation 
// the rights to use, copy, modify, merge, publish, distribute, sublicense, 
// and/or sell copies of the Software, and to permit persons to whom the 
// Software is furnished to do so, subject to the following conditions:
// 
// The above copyright notice and this permission notice shall be included in 
// all copies or substantial portions of the Software.
// 
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR 
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, 
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE 
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER 
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING 
// FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER 
// DEALINGS IN THE SOFTWARE.

use cfg_if::cfg_if;
use nix::errno::Errno;
use std::fmt;

use std::ffi::{
    CString, 
    NulError
};

cfg_if! {
    if #[cfg(feature = "python3")] {
        pub const PATH_INTERPRETER: &'static str = "/usr/bin/python3";
        
    } else {
        pub const PATH_INTERPRETER: &'static str = "/usr/bin/python2";
    }
}

pub const PATH_SCRIPT: &'static str = "/usr/libexec/virt-service/virt-service.py";

/* Interpreter, script, uid, user name, gid, group name and workdir */
pub const ARGV_FIXED_SLOTS: usize = 7;

/* Large enough for any decimal u32 */
pub const ID_BUFFER_LEN: usize = 64;

pub const MSG_PASSWD_ENTRY: &'static str = "Could not get passwd entry.";
pub const MSG_GROUP_ENTRY: &'static str = "Could not get group entry.";
pub const MSG_OUT_OF_MEMORY: &'static str = "Out of memory.";
pub const MSG_WORKDIR: &'static str = "Could not get working directory.";
pub const MSG_NUL_BYTE: &'static str = "Argument contains a nul byte.";
pub const MSG_RISE_PRIVILEGE: &'static str = "Rise priviledge failed.";
pub const MSG_EXEC: &'static str = "Could not execute";

/**
 * Every way the launcher can fail before the process image is replaced.
 *
 * `Display` yields the message text without the `Error: ` prefix,
 * which is added by `main()` when it terminates the process.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchError {
    PasswdEntry,
    GroupEntry,
    OutOfMemory,
    WorkDir(Errno),
    NulByte(usize),
    RisePrivilege(Errno),
    Exec(Errno),
}

impl fmt::Display for LaunchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaunchError::PasswdEntry => f.write_str(MSG_PASSWD_ENTRY),
            LaunchError::GroupEntry => f.write_str(MSG_GROUP_ENTRY),
            LaunchError::OutOfMemory => f.write_str(MSG_OUT_OF_MEMORY),
            LaunchError::WorkDir(_) => f.write_str(MSG_WORKDIR),
            LaunchError::NulByte(_) => f.write_str(MSG_NUL_BYTE),
            LaunchError::RisePrivilege(_) => f.write_str(MSG_RISE_PRIVILEGE),
            LaunchError::Exec(errno) => write!(f, "{} {}: {}", MSG_EXEC, PATH_INTERPRETER, errno.desc()),
        }
    }
}

impl std::error::Error for LaunchError {}

#[macro_export]
macro_rules! errx {
    ($x:expr) => {
        std::process::exit($x);
    };
    
    ($x:expr, $y:expr) => {
        eprintln!("{}", $y);
        std::process::exit($x);
    };

    ($x:expr, $y:expr, $($z:expr),+) => {
        eprintln!($y, $($z),+);
        std::process::exit($x);
    };
}

/**
 * Debug build tracing. Compiles to nothing in release builds.
 */
#[macro_export]
macro_rules! debugx {
    ($($arg:tt)+) => {
        if cfg!(debug_assertions) {
            eprintln!("debug: {}", ::std::format!($($arg)+));
        }
    };
}

/**
 * Convert raw bytes into a `CString` for slot `slot` of the argument vector.
 */
#[cfg_attr(debug_assertions, track_caller)]
pub fn into_cstring<T: Into<Vec<u8>>>(s: T, slot: usize) -> Result<CString, LaunchError> {
    CString::new(s).map_err(|_e: NulError| {
        cfg_if! {
            if #[cfg(debug_assertions)] {
                let loc = std::panic::Location::caller();
                eprintln!(
                    "debug: CString::new() failed at {}:{} -> {} (nul byte at position {})",
                    loc.file(),
                    loc.line(),
                    _e,
                    _e.nul_position()
                );
            }
        }

        LaunchError::NulByte(slot)
    })
}

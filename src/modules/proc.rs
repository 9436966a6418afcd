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

/**
 * Process level calls made by the launcher.
 *
 * Everything that touches the state of the running process (its ids, its
 * working directory, its privileges and finally its image) goes through the
 * `Host` trait. `NativeHost` performs the real system calls. Tests use their
 * own `Host` to observe failure paths without replacing the test process.
 */

use crate::shared::*;
use crate::debugx;
use std::convert::Infallible;
use std::ffi::CString;
use std::path::PathBuf;
use nix::errno::Errno;

use nix::unistd::{
    execvp, 
    getcwd,
    getuid,
    getgid,
    geteuid,
    setresuid, 
    Gid, 
    Uid
};

/**
 *
 */
pub trait Host {
    /**
     * The real user id of the invoking process
     */
    fn real_uid(&self) -> Uid;
    
    /**
     * The real group id of the invoking process
     */
    fn real_gid(&self) -> Gid;
    
    /**
     * The effective user id, i.e. the owner of a setuid binary
     */
    fn effective_uid(&self) -> Uid;
    
    /**
     * The current working directory, without any size limit
     */
    fn current_dir(&self) -> Result<PathBuf, Errno>;
    
    /**
     * Set the real and saved user id to `uid`
     */
    fn raise_privilege(&self, uid: Uid) -> Result<(), Errno>;
    
    /**
     * Replace the process image, searching PATH for `argv[0]`.
     * Only returns on failure.
     */
    fn exec(&self, argv: &[CString]) -> Result<Infallible, Errno>;
}

/**
 * The running process.
 */
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeHost;

impl Host for NativeHost {
    fn real_uid(&self) -> Uid { getuid() }
    
    fn real_gid(&self) -> Gid { getgid() }
    
    fn effective_uid(&self) -> Uid { geteuid() }
    
    fn current_dir(&self) -> Result<PathBuf, Errno> {
        getcwd()
    }
    
    fn raise_privilege(&self, uid: Uid) -> Result<(), Errno> {
        /*
         * setuid() only touches the effective id when the owner is not root,
         * setresuid() moves all three ids in either case.
         */
        setresuid(uid, uid, uid)
    }
    
    fn exec(&self, argv: &[CString]) -> Result<Infallible, Errno> {
        // Argv is never empty, the caller always provides the fixed slots
        match argv.first() {
            Some(cmd) => {
                debugx!("execvp({:?}) with {} arguments", cmd, argv.len());
                execvp(cmd, argv)
            }
            
            None => Err(Errno::EINVAL)
        }
    }
}

/**
 * Raise privilege to the effective user id of `host`.
 */
pub fn elevate<H: Host + ?Sized>(host: &H) -> Result<Uid, LaunchError> {
    let euid = host.effective_uid();
    
    host.raise_privilege(euid).map_err(|e| {
        debugx!("setresuid({0}, {0}, {0}) failed: {1}", euid, e);
        LaunchError::RisePrivilege(e)
    })?;
    
    debugx!("real and saved uid raised to {}", euid);
    
    Ok(euid)
}

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
 * Argument vector handed to the interpreter.
 *
 * ```text
 * [0] interpreter      /usr/bin/python2
 * [1] script           /usr/libexec/virt-service/virt-service.py
 * [2] userid           "1000"
 * [3] username         "alice"
 * [4] groupid          "50"
 * [5] groupname        "staff"
 * [6] workdir          "/home/alice/project"
 * [7..] pass-through   argv[1..] of the launcher, untouched
 * ```
 *
 * The terminating NULL pointer is appended by `execvp()` when it builds the
 * C array, so it never appears in the vector itself.
 */

use crate::shared::*;
use std::ffi::{CString, OsString};
use std::fmt::Write;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use super::user::Identity;

pub const SLOT_INTERPRETER: usize = 0;
pub const SLOT_SCRIPT: usize = 1;
pub const SLOT_UID: usize = 2;
pub const SLOT_USER: usize = 3;
pub const SLOT_GID: usize = 4;
pub const SLOT_GROUP: usize = 5;
pub const SLOT_WORKDIR: usize = 6;

/**
 * Render a numeric id as a decimal `CString`, reserving its buffer up front.
 */
fn decimal(id: u32, slot: usize) -> Result<CString, LaunchError> {
    let mut buff = String::new();
    
    buff.try_reserve_exact(ID_BUFFER_LEN).map_err(|_e| LaunchError::OutOfMemory)?;
    write!(buff, "{}", id).map_err(|_e| LaunchError::OutOfMemory)?;
    
    into_cstring(buff, slot)
}

/**
 * Reserve room for the fixed slots and `passthrough` more entries.
 */
pub fn allocate(passthrough: usize) -> Result<Vec<CString>, LaunchError> {
    let mut argv: Vec<CString> = Vec::new();
    
    ARGV_FIXED_SLOTS.checked_add(passthrough)
        .ok_or(LaunchError::OutOfMemory)
        .and_then(|len| argv.try_reserve_exact(len).map_err(|_e| LaunchError::OutOfMemory))?;
    
    Ok(argv)
}

/**
 * Fill `argv` with the fixed slots followed by the pass-through arguments.
 */
pub fn populate(
    mut argv: Vec<CString>, 
    identity: &Identity, 
    workdir: &Path, 
    passthrough: &[OsString]
) -> Result<Vec<CString>, LaunchError> {

    argv.push(into_cstring(PATH_INTERPRETER, SLOT_INTERPRETER)?);
    argv.push(into_cstring(PATH_SCRIPT, SLOT_SCRIPT)?);
    argv.push(decimal(identity.user().uid().as_raw(), SLOT_UID)?);
    argv.push(into_cstring(identity.user().name().as_bytes(), SLOT_USER)?);
    argv.push(decimal(identity.group().gid().as_raw(), SLOT_GID)?);
    argv.push(into_cstring(identity.group().name().as_bytes(), SLOT_GROUP)?);
    argv.push(into_cstring(workdir.as_os_str().as_bytes(), SLOT_WORKDIR)?);
    
    for (i, arg) in passthrough.iter().enumerate() {
        argv.push(into_cstring(arg.as_bytes(), ARGV_FIXED_SLOTS + i)?);
    }
    
    Ok(argv)
}

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
 * The launcher itself.
 *
 * ### Command Flow
 * ```text
 * resolve identity  →  allocate argv  →  build argv  →  elevate  →  execvp(python, ...)
 * ```
 *
 * Each step either succeeds or ends the launch with a `LaunchError`. There is
 * no branching besides that and nothing is retried. `launch()` never returns
 * `Ok`, since a successful exec replaces the process.
 */

use crate::shared::*;
use crate::debugx;
use std::convert::Infallible;
use std::ffi::OsString;
use super::argv::{allocate, populate};
use super::proc::{elevate, Host};

use super::user::{
    Identity, 
    IdentityDb
};

/**
 * Launch the interpreter on behalf of the caller.
 *
 * `passthrough` is the launcher's own argv without argv[0].
 */
pub fn launch<D, H>(db: &D, host: &H, passthrough: &[OsString]) -> Result<Infallible, LaunchError>
where
    D: IdentityDb + ?Sized,
    H: Host + ?Sized
{
    let identity: Identity = Identity::resolve(db, host.real_uid(), host.real_gid())?;
    let argv = allocate(passthrough.len())?;
    
    let workdir = host.current_dir().map_err(|e| {
        debugx!("getcwd() failed: {}", e);
        LaunchError::WorkDir(e)
    })?;
    
    let argv = populate(argv, &identity, &workdir, passthrough)?;
    
    elevate(host)?;
    
    let err = host.exec(&argv).map_err(LaunchError::Exec);
    debugx!("execvp() returned: {:?}", err);
    
    err
}

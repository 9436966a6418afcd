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
 * virt-service-daemon — setuid entry point of virt-service.
 *
 * The binary is installed setuid, owned by the account virt-service runs as.
 * It looks up who actually invoked it, raises its real user id to the owner
 * and replaces itself with the Python service, passing along:
 *
 * ```
 * virt-service.py <uid> <user> <gid> <group> <workdir> [ARGS...]
 * ```
 *
 * No options are recognized; every argument is passed through as is.
 */

#[macro_use]
extern crate virt_service_daemon;

use virt_service_daemon::modules::launch::launch;
use virt_service_daemon::modules::proc::NativeHost;
use virt_service_daemon::modules::user::SystemDb;
use std::env;
use std::ffi::OsString;

fn main() {
    let argv_in: Vec<OsString> = env::args_os().skip(1).collect();
    
    if let Err(e) = launch(&SystemDb, &NativeHost, &argv_in) {
        errx!(libc::EXIT_FAILURE, "Error: {}", e);
    }
}

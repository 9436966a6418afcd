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
 * User and Group abstractions over the system identity database.
 *
 * The launcher only ever needs two lookups: the passwd entry of the real
 * user id and the group entry of the real group id. Both go through the
 * `IdentityDb` trait so that the lookups can be swapped out:
 *
 *  - `SystemDb`: the real database, through `getpwuid_r()` / `getgrgid_r()`
 *  - anything else implementing `IdentityDb`, e.g. a fixed table in tests
 *
 * Names are kept as the raw bytes of `pw_name` / `gr_name`. The database
 * does not promise UTF-8 and the names are handed on untouched.
 *
 * A lookup that fails and a lookup that finds nothing are treated alike,
 * the same way a NULL from getpwuid() would be.
 */

use crate::shared::*;
use crate::debugx;
use nix::errno::Errno;
use std::ffi::{CStr, OsStr, OsString};
use std::os::unix::ffi::OsStringExt;

use std::{
    mem,
    ptr
};

use nix::unistd::{
    Uid as C_Uid,
    Gid as C_Gid
};

use libc::{
    c_char,
    c_int,
    gid_t,
    uid_t,
    group as c_group,
    passwd as c_passwd,
    getgrgid_r,
    getpwuid_r
};

/* Used when sysconf() has no suggestion */
const ENTRY_BUFFER_LEN: usize = 1024;

/* Give up growing the entry buffer past this */
const ENTRY_BUFFER_MAX: usize = 1 << 20;

/**
 * Represents a system group, including name and numeric ID.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub(in self) gid: C_Gid,
    pub(in self) name: OsString
}

/**
 * Represents a system user, including name and UID.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub(in self) uid: C_Uid,
    pub(in self) name: OsString
}

/**
 * The resolved identity of the invoking process.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub(in self) user: User,
    pub(in self) group: Group
}

/**
 * Source of passwd and group entries.
 */
pub trait IdentityDb {
    fn user_by_uid(&self, uid: C_Uid) -> Option<User>;
    fn group_by_gid(&self, gid: C_Gid) -> Option<Group>;
}

/**
 * The identity database of the running system.
 */
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemDb;

impl User {
    pub fn new<S: Into<OsString>>(uid: C_Uid, name: S) -> Self {
        User { uid, name: name.into() }
    }
    
    /**
     * Return the user name
     */
    pub fn name(&self) -> &OsStr { &self.name }
    
    /**
     * Return the user ID
     */
    pub fn uid(&self) -> C_Uid { self.uid }
}

impl Group {
    pub fn new<S: Into<OsString>>(gid: C_Gid, name: S) -> Self {
        Group { gid, name: name.into() }
    }
    
    /**
     * Return the group name
     */
    pub fn name(&self) -> &OsStr { &self.name }
    
    /**
     * Return the group ID
     */
    pub fn gid(&self) -> C_Gid { self.gid }
}

impl Identity {
    pub fn user(&self) -> &User { &self.user }
    
    pub fn group(&self) -> &Group { &self.group }

    /**
     * Resolve the passwd entry for `uid` and the group entry for `gid`.
     *
     * The user is looked up first, and the group lookup is never
     * attempted when the user cannot be found.
     */
    pub fn resolve<D: IdentityDb + ?Sized>(db: &D, uid: C_Uid, gid: C_Gid) -> Result<Self, LaunchError> {
        let user = db.user_by_uid(uid).ok_or(LaunchError::PasswdEntry)?;
        debugx!("resolved uid {} to {:?}", uid, user.name());
        
        let group = db.group_by_gid(gid).ok_or(LaunchError::GroupEntry)?;
        debugx!("resolved gid {} to {:?}", gid, group.name());
        
        Ok(
            Identity { user, group }
        )
    }
}

/**
 * Initial buffer size for a reentrant entry lookup.
 */
fn entry_buffer_len(key: c_int) -> usize {
    match unsafe { libc::sysconf(key) } {
        n if n > 0 => n as usize,
        _ => ENTRY_BUFFER_LEN
    }
}

/**
 * Drive one of the `get*_r()` calls and copy out the name of the entry.
 *
 * `call` fills the entry from the scratch buffer and reports the result
 * pointer, `name` picks the name field of a filled entry. The buffer is
 * doubled on ERANGE until `ENTRY_BUFFER_MAX`.
 */
fn lookup_name<E, F, N>(size_key: c_int, call: F, name: N) -> Result<Option<OsString>, Errno>
where
    F: Fn(*mut E, *mut c_char, usize, *mut *mut E) -> c_int,
    N: Fn(&E) -> *const c_char
{
    let mut buff: Vec<c_char> = vec![0; entry_buffer_len(size_key)];
    
    loop {
        // SAFETY: passwd and group are plain C structs, all zero is a valid value
        let mut entry: E = unsafe { mem::zeroed() };
        let mut result: *mut E = ptr::null_mut();
        
        let rc = call(&mut entry as *mut E, buff.as_mut_ptr(), buff.len(), &mut result as *mut *mut E);
        
        if rc == libc::ERANGE && buff.len() < ENTRY_BUFFER_MAX {
            let len = buff.len() * 2;
            buff.resize(len, 0);
            
            continue;
            
        } else if rc != 0 {
            return Err(Errno::from_i32(rc));
            
        } else if result.is_null() {
            return Ok(None);
        }
        
        let field = name(&entry);
        
        if field.is_null() {
            return Ok(None);
        }
        
        // SAFETY: a successful lookup points the name into `buff`, which is still alive
        let bytes = unsafe { CStr::from_ptr(field) }.to_bytes().to_vec();
        
        return Ok(
            Some(OsString::from_vec(bytes))
        );
    }
}

impl IdentityDb for SystemDb {
    fn user_by_uid(&self, uid: C_Uid) -> Option<User> {
        let raw: uid_t = uid.as_raw();
        let found = lookup_name::<c_passwd, _, _>(
            libc::_SC_GETPW_R_SIZE_MAX,
            |pwd, buf, len, res| unsafe { getpwuid_r(raw, pwd, buf, len, res) },
            |pwd| pwd.pw_name as *const c_char
        );
        
        match found {
            Ok(Some(name)) => Some(User { uid, name }),
            Ok(None) => None,
            
            Err(_e) => {
                debugx!("getpwuid_r({}) failed: {}", uid, _e);
                None
            }
        }
    }
    
    fn group_by_gid(&self, gid: C_Gid) -> Option<Group> {
        let raw: gid_t = gid.as_raw();
        let found = lookup_name::<c_group, _, _>(
            libc::_SC_GETGR_R_SIZE_MAX,
            |grp, buf, len, res| unsafe { getgrgid_r(raw, grp, buf, len, res) },
            |grp| grp.gr_name as *const c_char
        );
        
        match found {
            Ok(Some(name)) => Some(Group { gid, name }),
            Ok(None) => None,
            
            Err(_e) => {
                debugx!("getgrgid_r({}) failed: {}", gid, _e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Table {
        users: Vec<User>,
        groups: Vec<Group>,
        group_lookups: Cell<usize>
    }

    impl IdentityDb for Table {
        fn user_by_uid(&self, uid: C_Uid) -> Option<User> {
            self.users.iter().find(|u| u.uid() == uid).cloned()
        }

        fn group_by_gid(&self, gid: C_Gid) -> Option<Group> {
            self.group_lookups.set(self.group_lookups.get() + 1);
            self.groups.iter().find(|g| g.gid() == gid).cloned()
        }
    }

    fn table() -> Table {
        Table {
            users: vec![
                User::new(C_Uid::from_raw(1000), "alice"),
                User::new(C_Uid::from_raw(1001), OsString::from_vec(b"\xffbob".to_vec()))
            ],
            groups: vec![Group::new(C_Gid::from_raw(50), "staff")],
            group_lookups: Cell::new(0)
        }
    }

    #[test]
    fn resolves_user_and_group() {
        let db = table();
        let id = Identity::resolve(&db, C_Uid::from_raw(1000), C_Gid::from_raw(50)).unwrap();

        assert_eq!(id.user().name(), "alice");
        assert_eq!(id.user().uid().as_raw(), 1000);
        assert_eq!(id.group().name(), "staff");
        assert_eq!(id.group().gid().as_raw(), 50);
    }

    #[test]
    fn names_keep_their_bytes() {
        use std::os::unix::ffi::OsStrExt;

        let db = table();
        let id = Identity::resolve(&db, C_Uid::from_raw(1001), C_Gid::from_raw(50)).unwrap();

        assert_eq!(id.user().name().as_bytes(), b"\xffbob");
    }

    #[test]
    fn missing_user_skips_group_lookup() {
        let db = table();
        let err = Identity::resolve(&db, C_Uid::from_raw(4242), C_Gid::from_raw(50)).unwrap_err();

        assert_eq!(err, LaunchError::PasswdEntry);
        assert_eq!(db.group_lookups.get(), 0);
    }

    #[test]
    fn missing_group() {
        let db = table();
        let err = Identity::resolve(&db, C_Uid::from_raw(1000), C_Gid::from_raw(4242)).unwrap_err();

        assert_eq!(err, LaunchError::GroupEntry);
    }

    #[test]
    fn system_db_knows_root() {
        let db = SystemDb;
        let user = db.user_by_uid(C_Uid::from_raw(0)).unwrap();
        let group = db.group_by_gid(C_Gid::from_raw(0)).unwrap();

        assert_eq!(user.uid().as_raw(), 0);
        assert_eq!(group.gid().as_raw(), 0);
        assert_eq!(user.name(), "root");
    }

    #[test]
    fn system_db_agrees_with_nix() {
        let uid = nix::unistd::getuid();
        let gid = nix::unistd::getgid();

        let ours = SystemDb.user_by_uid(uid).map(|u| u.name().to_string_lossy().into_owned());
        let theirs = nix::unistd::User::from_uid(uid).unwrap().map(|u| u.name);
        assert_eq!(ours, theirs);

        let ours = SystemDb.group_by_gid(gid).map(|g| g.name().to_string_lossy().into_owned());
        let theirs = nix::unistd::Group::from_gid(gid).unwrap().map(|g| g.name);
        assert_eq!(ours, theirs);
    }

    #[test]
    fn unknown_ids_are_not_found() {
        // Highest id short of the (uid_t)-1 sentinel
        assert!(SystemDb.user_by_uid(C_Uid::from_raw(u32::MAX - 1)).is_none());
        assert!(SystemDb.group_by_gid(C_Gid::from_raw(u32::MAX - 1)).is_none());
    }
}

//! System users and groups

use anyhow::{Context, Result, bail};
use std::ffi::{CStr, CString};
use std::fmt;

use crate::runner;

/// Creates and looks up system accounts
pub trait Accounts: Send + Sync + fmt::Debug {
    fn group_exists(&self, name: &str) -> Result<bool>;
    fn user_exists(&self, name: &str) -> Result<bool>;
    fn create_group(&self, name: &str) -> Result<()>;
    /// Create a system user whose primary group is `group`
    fn create_user(&self, name: &str, group: &str, shell: &str) -> Result<()>;
}

/// Accounts managed through the shadow-utils tools
#[derive(Debug, Default)]
pub struct SystemAccounts;

impl Accounts for SystemAccounts {
    fn group_exists(&self, name: &str) -> Result<bool> {
        Ok(gid_by_name(name)?.is_some())
    }

    fn user_exists(&self, name: &str) -> Result<bool> {
        Ok(uid_by_name(name)?.is_some())
    }

    fn create_group(&self, name: &str) -> Result<()> {
        runner::run_capture("groupadd", &["--system", name])
            .with_context(|| format!("Failed to create group {name}"))?;
        Ok(())
    }

    fn create_user(&self, name: &str, group: &str, shell: &str) -> Result<()> {
        runner::run_capture(
            "useradd",
            &["--system", "--gid", group, "--shell", shell, name],
        )
        .with_context(|| format!("Failed to create user {name}"))?;
        Ok(())
    }
}

fn c_name(name: &str) -> Result<CString> {
    CString::new(name).with_context(|| format!("Invalid account name: {name:?}"))
}

/// Look up a user id by name
pub fn uid_by_name(name: &str) -> Result<Option<u32>> {
    let c_name = c_name(name)?;
    // SAFETY: c_name is NUL-terminated; the returned record is read before
    // any other passwd call can overwrite it.
    let uid = unsafe {
        let pw = libc::getpwnam(c_name.as_ptr());
        if pw.is_null() { None } else { Some((*pw).pw_uid) }
    };
    Ok(uid)
}

/// Look up a group id by name
pub fn gid_by_name(name: &str) -> Result<Option<u32>> {
    let c_name = c_name(name)?;
    // SAFETY: as in uid_by_name, for the group database.
    let gid = unsafe {
        let gr = libc::getgrnam(c_name.as_ptr());
        if gr.is_null() { None } else { Some((*gr).gr_gid) }
    };
    Ok(gid)
}

/// Name of a user id, or the id itself when it has no entry
pub fn user_name(uid: u32) -> String {
    // SAFETY: the name is copied out before returning.
    let name = unsafe {
        let pw = libc::getpwuid(uid);
        if pw.is_null() {
            None
        } else {
            Some(CStr::from_ptr((*pw).pw_name).to_string_lossy().into_owned())
        }
    };
    name.unwrap_or_else(|| uid.to_string())
}

/// Name of a group id, or the id itself when it has no entry
pub fn group_name(gid: u32) -> String {
    // SAFETY: the name is copied out before returning.
    let name = unsafe {
        let gr = libc::getgrgid(gid);
        if gr.is_null() {
            None
        } else {
            Some(CStr::from_ptr((*gr).gr_name).to_string_lossy().into_owned())
        }
    };
    name.unwrap_or_else(|| gid.to_string())
}

/// Resolve a user and group pair to ids, failing on unknown names
pub fn resolve_ids(user: &str, group: &str) -> Result<(u32, u32)> {
    let Some(uid) = uid_by_name(user)? else {
        bail!("Unknown user: {user}");
    };
    let Some(gid) = gid_by_name(group)? else {
        bail!("Unknown group: {group}");
    };
    Ok((uid, gid))
}

//! Managed resources of a Tomcat instance
//!
//! Every step of a pass is a [`Resource`] with:
//! - State detection (current vs desired)
//! - Apply function (converge current → desired)
//! - Trigger edges to the service it affects
//!
//! Resources reach the host only through the capabilities in
//! [`crate::host`].

use anyhow::Result;
use std::path::Path;

use crate::host::{FileStat, Filesystem};

pub use declarative::{ApplyContext, ApplyResult, Resource, ResourceState, Trigger};

pub mod account;
pub mod directory;
pub mod install;
pub mod remote_file;
pub mod service;
pub mod symlink;
pub mod template;

pub use account::{Group, User};
pub use directory::Directory;
pub use install::Install;
pub use remote_file::RemoteFile;
pub use service::ServiceUnit;
pub use symlink::Symlink;
pub use template::TemplateFile;

/// Owner, group and permission bits of a managed path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ownership {
    pub owner: String,
    pub group: String,
    pub mode: u32,
}

impl Ownership {
    pub fn new(owner: &str, group: &str, mode: u32) -> Self {
        Self {
            owner: owner.to_string(),
            group: group.to_string(),
            mode,
        }
    }

    pub fn describe(&self) -> String {
        format!("{}:{} {:04o}", self.owner, self.group, self.mode)
    }

    pub fn matches(&self, stat: &FileStat) -> bool {
        stat.owner == self.owner && stat.group == self.group && stat.mode == self.mode
    }

    /// Reapply only the attributes that differ from `stat`
    ///
    /// Returns whether anything was changed.
    pub fn enforce(&self, fs: &dyn Filesystem, path: &Path, stat: &FileStat) -> Result<bool> {
        let mut changed = false;
        if stat.owner != self.owner || stat.group != self.group {
            fs.set_owner(path, &self.owner, &self.group)?;
            changed = true;
        }
        if stat.mode != self.mode {
            fs.set_mode(path, self.mode)?;
            changed = true;
        }
        Ok(changed)
    }

    /// Set every attribute on a freshly created path
    pub fn apply(&self, fs: &dyn Filesystem, path: &Path) -> Result<()> {
        fs.set_owner(path, &self.owner, &self.group)?;
        fs.set_mode(path, self.mode)
    }
}

pub fn describe_stat(stat: &FileStat) -> String {
    format!("{}:{} {:04o}", stat.owner, stat.group, stat.mode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::memory::MemoryFs;

    #[test]
    fn enforce_changes_only_what_differs() {
        let fs = MemoryFs::default();
        let path = Path::new("/srv");
        fs.create_dir(path, false).unwrap();

        let wanted = Ownership::new("root", "root", 0o700);
        let before = fs.mutation_count();
        let stat = fs.stat(path).unwrap().unwrap();
        assert!(wanted.enforce(&fs, path, &stat).unwrap());
        assert_eq!(fs.mutation_count(), before + 1);

        let stat = fs.stat(path).unwrap().unwrap();
        assert!(wanted.matches(&stat));
        assert!(!wanted.enforce(&fs, path, &stat).unwrap());
    }

    #[test]
    fn describes_in_octal() {
        assert_eq!(Ownership::new("root", "app1", 0o640).describe(), "root:app1 0640");
    }
}

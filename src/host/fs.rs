//! Filesystem primitives
//!
//! Resources never touch `std::fs` directly; they go through [`Filesystem`]
//! so a pass can be run against an in-memory host in tests.

use anyhow::{Context, Result};
use std::fmt;
use std::fs;
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::{Path, PathBuf};

use super::accounts;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    File,
    Dir,
    Symlink,
}

/// Result of an `lstat`; symlinks are reported, not followed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStat {
    pub kind: FileKind,
    pub owner: String,
    pub group: String,
    /// Permission bits only (`0o7777` mask)
    pub mode: u32,
}

pub trait Filesystem: Send + Sync + fmt::Debug {
    /// Stat a path without following a final symlink; `None` if missing
    fn stat(&self, path: &Path) -> Result<Option<FileStat>>;
    fn read(&self, path: &Path) -> Result<Vec<u8>>;
    /// Create or truncate a regular file
    fn write(&self, path: &Path, contents: &[u8]) -> Result<()>;
    fn create_dir(&self, path: &Path, recursive: bool) -> Result<()>;
    /// Entries of a directory, sorted
    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;
    /// Remove a file, a symlink, or a directory tree
    fn remove(&self, path: &Path) -> Result<()>;
    fn read_link(&self, path: &Path) -> Result<PathBuf>;
    fn symlink(&self, target: &Path, link: &Path) -> Result<()>;
    /// Change owner and group; a symlink itself is changed, not its target
    fn set_owner(&self, path: &Path, owner: &str, group: &str) -> Result<()>;
    fn set_mode(&self, path: &Path, mode: u32) -> Result<()>;

    fn exists(&self, path: &Path) -> Result<bool> {
        Ok(self.stat(path)?.is_some())
    }

    fn is_dir(&self, path: &Path) -> Result<bool> {
        Ok(self
            .stat(path)?
            .is_some_and(|s| s.kind == FileKind::Dir))
    }
}

/// The host's real filesystem
#[derive(Debug, Default)]
pub struct LocalFs;

impl Filesystem for LocalFs {
    fn stat(&self, path: &Path) -> Result<Option<FileStat>> {
        let meta = match fs::symlink_metadata(path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).with_context(|| format!("Failed to stat {}", path.display())),
        };

        let file_type = meta.file_type();
        let kind = if file_type.is_symlink() {
            FileKind::Symlink
        } else if file_type.is_dir() {
            FileKind::Dir
        } else {
            FileKind::File
        };

        Ok(Some(FileStat {
            kind,
            owner: accounts::user_name(meta.uid()),
            group: accounts::group_name(meta.gid()),
            mode: meta.mode() & 0o7777,
        }))
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))
    }

    fn create_dir(&self, path: &Path, recursive: bool) -> Result<()> {
        let result = if recursive {
            fs::create_dir_all(path)
        } else {
            fs::create_dir(path)
        };
        result.with_context(|| format!("Failed to create directory {}", path.display()))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = fs::read_dir(path)
            .with_context(|| format!("Failed to list {}", path.display()))?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<Vec<_>>>()
            .with_context(|| format!("Failed to list {}", path.display()))?;
        entries.sort();
        Ok(entries)
    }

    fn remove(&self, path: &Path) -> Result<()> {
        let meta = fs::symlink_metadata(path)
            .with_context(|| format!("Failed to stat {}", path.display()))?;
        let result = if meta.is_dir() {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        };
        result.with_context(|| format!("Failed to remove {}", path.display()))
    }

    fn read_link(&self, path: &Path) -> Result<PathBuf> {
        fs::read_link(path).with_context(|| format!("Failed to read link {}", path.display()))
    }

    fn symlink(&self, target: &Path, link: &Path) -> Result<()> {
        std::os::unix::fs::symlink(target, link).with_context(|| {
            format!(
                "Failed to create symlink {} -> {}",
                link.display(),
                target.display()
            )
        })
    }

    fn set_owner(&self, path: &Path, owner: &str, group: &str) -> Result<()> {
        let (uid, gid) = accounts::resolve_ids(owner, group)?;
        std::os::unix::fs::lchown(path, Some(uid), Some(gid)).with_context(|| {
            format!("Failed to chown {} to {owner}:{group}", path.display())
        })
    }

    fn set_mode(&self, path: &Path, mode: u32) -> Result<()> {
        fs::set_permissions(path, fs::Permissions::from_mode(mode))
            .with_context(|| format!("Failed to chmod {:o} {}", mode, path.display()))
    }
}

//! Gzipped tarball extraction through a [`Filesystem`]

use anyhow::{Context, Result, bail};
use flate2::read::GzDecoder;
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use tar::{Archive, EntryType};

use super::fs::{FileKind, Filesystem};

/// Drop the first `strip` components of an archive path
///
/// Returns `None` for entries consumed entirely by the strip (the top-level
/// directory itself). Fails on paths that would escape the destination.
pub fn strip_components(path: &Path, strip: usize) -> Result<Option<PathBuf>> {
    let mut parts = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => parts.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                bail!("Refusing archive entry outside the install root: {}", path.display());
            }
        }
    }

    if parts.len() <= strip {
        return Ok(None);
    }
    Ok(Some(parts[strip..].iter().collect()))
}

/// Unpack a `.tar.gz` into `dest`, returning the number of entries written
pub fn unpack(fs: &dyn Filesystem, data: &[u8], dest: &Path, strip: usize) -> Result<usize> {
    let mut archive = Archive::new(GzDecoder::new(data));
    let mut written = 0;

    for entry in archive.entries().context("Failed to read archive")? {
        let mut entry = entry.context("Corrupt archive entry")?;
        let raw = entry.path().context("Invalid entry path")?.into_owned();
        let Some(relative) = strip_components(&raw, strip)? else {
            continue;
        };
        refuse_linked_ancestors(fs, dest, &relative)?;
        let target = dest.join(&relative);
        let mode = entry.header().mode().unwrap_or(0o644) & 0o7777;

        match entry.header().entry_type() {
            EntryType::Directory => {
                fs.create_dir(&target, true)?;
                fs.set_mode(&target, mode)?;
            }
            EntryType::Regular | EntryType::Continuous => {
                ensure_parent(fs, &target)?;
                let mut contents = Vec::new();
                entry
                    .read_to_end(&mut contents)
                    .with_context(|| format!("Failed to read {} from archive", raw.display()))?;
                fs.write(&target, &contents)?;
                fs.set_mode(&target, mode)?;
            }
            EntryType::Symlink => {
                let Some(link_target) = entry.link_name().context("Invalid link target")? else {
                    continue;
                };
                if !link_stays_inside(&relative, &link_target) {
                    bail!(
                        "Refusing symlink {} -> {} outside the install root",
                        raw.display(),
                        link_target.display()
                    );
                }
                ensure_parent(fs, &target)?;
                fs.symlink(&link_target, &target)?;
            }
            other => {
                log::debug!("Skipping {:?} entry {}", other, raw.display());
                continue;
            }
        }
        written += 1;
    }

    Ok(written)
}

/// Whether a link at `relative` pointing to `link_target` resolves inside
/// the destination, judged lexically
fn link_stays_inside(relative: &Path, link_target: &Path) -> bool {
    let mut depth = relative.components().count().saturating_sub(1);
    for component in link_target.components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::ParentDir => match depth.checked_sub(1) {
                Some(up) => depth = up,
                None => return false,
            },
            Component::RootDir | Component::Prefix(_) => return false,
        }
    }
    true
}

/// Fail if the entry itself or any directory leading to it is a symlink,
/// so nothing is ever written through a link
fn refuse_linked_ancestors(fs: &dyn Filesystem, dest: &Path, relative: &Path) -> Result<()> {
    let mut path = dest.to_path_buf();
    for component in relative.components() {
        path.push(component);
        if fs.stat(&path)?.is_some_and(|s| s.kind == FileKind::Symlink) {
            bail!("Refusing to extract through symlink {}", path.display());
        }
    }
    Ok(())
}

fn ensure_parent(fs: &dyn Filesystem, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !fs.is_dir(parent)?
    {
        fs.create_dir(parent, true)?;
    }
    Ok(())
}

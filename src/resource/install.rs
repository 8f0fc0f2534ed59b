//! One-time archive extraction into the install root
//!
//! The presence of `<home>/webapps` marks an installed tree. Once it
//! exists this resource never extracts, prunes or re-permissions again;
//! the directory resources that follow keep the tree in shape.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{ApplyContext, ApplyResult, Resource, ResourceState};
use crate::host::{FileKind, Filesystem, archive};

/// Directories and sample webapps removed from a fresh tree
const PRUNED: [&str; 6] = [
    "logs",
    "temp",
    "work",
    "webapps/ROOT",
    "webapps/docs",
    "webapps/examples",
];

#[derive(Debug, Clone)]
pub struct Install {
    pub home: PathBuf,
    pub archive: PathBuf,
    pub group: String,
    fs: Arc<dyn Filesystem>,
}

impl Install {
    pub fn new(
        home: impl Into<PathBuf>,
        archive: impl Into<PathBuf>,
        group: &str,
        fs: Arc<dyn Filesystem>,
    ) -> Self {
        Self {
            home: home.into(),
            archive: archive.into(),
            group: group.to_string(),
            fs,
        }
    }

    fn is_installed(&self) -> Result<bool> {
        self.fs.is_dir(&self.home.join("webapps"))
    }

    /// Visible entries of `<home>/<dir>`, like the shell glob `dir/*`
    fn children(&self, dir: &str) -> Result<Vec<PathBuf>> {
        let path = self.home.join(dir);
        if !self.fs.is_dir(&path)? {
            return Ok(Vec::new());
        }
        Ok(self
            .fs
            .read_dir(&path)?
            .into_iter()
            .filter(|p| {
                p.file_name()
                    .is_some_and(|n| !n.to_string_lossy().starts_with('.'))
            })
            .collect())
    }

    fn children_with_extension(&self, dir: &str, ext: &str) -> Result<Vec<PathBuf>> {
        Ok(self
            .children(dir)?
            .into_iter()
            .filter(|p| p.extension().is_some_and(|e| e == ext))
            .collect())
    }

    fn prune(&self, verbose: bool) -> Result<()> {
        let mut doomed: Vec<PathBuf> = PRUNED.iter().map(|p| self.home.join(p)).collect();
        doomed.extend(self.children_with_extension("bin", "bat")?);

        for path in doomed {
            if self.fs.exists(&path)? {
                if verbose {
                    log::info!("Pruning {}", path.display());
                } else {
                    log::debug!("Pruning {}", path.display());
                }
                self.fs.remove(&path)?;
            }
        }
        Ok(())
    }

    fn set_permissions(&self) -> Result<()> {
        for dir in ["bin", "conf", "lib", "webapps"] {
            for path in self.children(dir)? {
                self.fs.set_owner(&path, "root", &self.group)?;
            }
        }

        let mut private = self.children("conf")?;
        private.extend(self.children("lib")?);
        private.extend(self.children_with_extension("bin", "jar")?);
        self.chmod_all(&private, 0o640)?;

        let mut executable = self.children_with_extension("bin", "sh")?;
        executable.extend(self.children("webapps")?);
        self.chmod_all(&executable, 0o750)
    }

    /// Symlinks are skipped so a mode never leaks outside the tree
    fn chmod_all(&self, paths: &[PathBuf], mode: u32) -> Result<()> {
        for path in paths {
            let is_link = self
                .fs
                .stat(path)?
                .is_some_and(|s| s.kind == FileKind::Symlink);
            if !is_link {
                self.fs.set_mode(path, mode)?;
            }
        }
        Ok(())
    }

    fn extract(&self, archive: &Path) -> Result<()> {
        let data = self.fs.read(archive)?;
        let count = archive::unpack(self.fs.as_ref(), &data, &self.home, 1)
            .with_context(|| format!("Failed to extract {}", archive.display()))?;
        log::info!("Extracted {count} entries into {}", self.home.display());
        Ok(())
    }
}

impl Resource for Install {
    fn id(&self) -> String {
        self.home.display().to_string()
    }

    fn description(&self) -> String {
        format!(
            "Install {} into {}",
            self.archive.display(),
            self.home.display()
        )
    }

    fn resource_type(&self) -> &'static str {
        "install"
    }

    fn current_state(&self) -> Result<ResourceState> {
        if self.is_installed()? {
            Ok(self.desired_state())
        } else {
            Ok(ResourceState::Absent)
        }
    }

    fn desired_state(&self) -> ResourceState {
        ResourceState::Present {
            details: Some("installed".to_string()),
        }
    }

    fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
        if self.is_installed()? {
            return Ok(ApplyResult::NoChange);
        }

        self.extract(&self.archive)?;
        self.prune(ctx.verbose)?;
        self.set_permissions()?;
        Ok(ApplyResult::Created)
    }

    /// The extracted tree ships its own `conf/` files, which the template
    /// resources then rewrite as part of the same install
    fn provisions(&self) -> bool {
        true
    }
}

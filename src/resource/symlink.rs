//! Symlink resource

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;

use super::{ApplyContext, ApplyResult, Resource, ResourceState};
use crate::host::{FileKind, Filesystem};

/// A symlink at `link` pointing to `target`
#[derive(Debug, Clone)]
pub struct Symlink {
    /// What the symlink points to
    pub target: PathBuf,
    /// Where the symlink is created
    pub link: PathBuf,
    fs: Arc<dyn Filesystem>,
}

#[derive(Debug)]
enum SymlinkState {
    Missing,
    Correct,
    WrongTarget(PathBuf),
    NotALink(FileKind),
}

impl Symlink {
    pub fn new(target: impl Into<PathBuf>, link: impl Into<PathBuf>, fs: Arc<dyn Filesystem>) -> Self {
        Self {
            target: target.into(),
            link: link.into(),
            fs,
        }
    }

    fn check_current(&self) -> Result<SymlinkState> {
        let Some(stat) = self.fs.stat(&self.link)? else {
            return Ok(SymlinkState::Missing);
        };
        if stat.kind != FileKind::Symlink {
            return Ok(SymlinkState::NotALink(stat.kind));
        }

        let actual = self.fs.read_link(&self.link)?;
        if actual == self.target {
            Ok(SymlinkState::Correct)
        } else {
            Ok(SymlinkState::WrongTarget(actual))
        }
    }
}

impl Resource for Symlink {
    fn id(&self) -> String {
        self.link.display().to_string()
    }

    fn description(&self) -> String {
        format!("Symlink {} -> {}", self.link.display(), self.target.display())
    }

    fn resource_type(&self) -> &'static str {
        "link"
    }

    fn current_state(&self) -> Result<ResourceState> {
        match self.check_current()? {
            SymlinkState::Missing => Ok(ResourceState::Absent),
            SymlinkState::Correct => Ok(self.desired_state()),
            SymlinkState::WrongTarget(actual) => Ok(ResourceState::Modified {
                from: format!("-> {}", actual.display()),
                to: format!("-> {}", self.target.display()),
            }),
            SymlinkState::NotALink(kind) => Ok(ResourceState::Modified {
                from: format!("{kind:?}").to_lowercase(),
                to: format!("symlink -> {}", self.target.display()),
            }),
        }
    }

    fn desired_state(&self) -> ResourceState {
        ResourceState::Present {
            details: Some(format!("-> {}", self.target.display())),
        }
    }

    fn apply(&self, _ctx: &mut ApplyContext) -> Result<ApplyResult> {
        match self.check_current()? {
            SymlinkState::Correct => Ok(ApplyResult::NoChange),
            SymlinkState::Missing => {
                self.fs.symlink(&self.target, &self.link)?;
                Ok(ApplyResult::Created)
            }
            SymlinkState::WrongTarget(_) => {
                self.fs.remove(&self.link)?;
                self.fs.symlink(&self.target, &self.link)?;
                Ok(ApplyResult::Modified)
            }
            SymlinkState::NotALink(kind) => {
                // Never replace real data with a link
                log::warn!(
                    "{} is a {:?}, not a symlink; leaving it in place",
                    self.link.display(),
                    kind
                );
                Ok(ApplyResult::Skipped {
                    reason: format!("{} exists and is not a symlink", self.link.display()),
                })
            }
        }
    }
}

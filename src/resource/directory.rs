//! Directory resource

use anyhow::{Result, bail};
use std::path::PathBuf;
use std::sync::Arc;

use super::{ApplyContext, ApplyResult, Ownership, Resource, ResourceState, describe_stat};
use crate::host::{FileKind, Filesystem};

/// A directory with fixed ownership and mode
///
/// Missing parents are created when `recursive` is set; only the leaf
/// receives the ownership and mode.
#[derive(Debug, Clone)]
pub struct Directory {
    pub path: PathBuf,
    pub ownership: Ownership,
    pub recursive: bool,
    fs: Arc<dyn Filesystem>,
}

impl Directory {
    pub fn new(path: impl Into<PathBuf>, ownership: Ownership, fs: Arc<dyn Filesystem>) -> Self {
        Self {
            path: path.into(),
            ownership,
            recursive: false,
            fs,
        }
    }

    pub fn recursive(mut self) -> Self {
        self.recursive = true;
        self
    }
}

impl Resource for Directory {
    fn id(&self) -> String {
        self.path.display().to_string()
    }

    fn description(&self) -> String {
        format!(
            "Directory {} ({})",
            self.path.display(),
            self.ownership.describe()
        )
    }

    fn resource_type(&self) -> &'static str {
        "directory"
    }

    fn current_state(&self) -> Result<ResourceState> {
        let Some(stat) = self.fs.stat(&self.path)? else {
            return Ok(ResourceState::Absent);
        };

        if stat.kind != FileKind::Dir {
            return Ok(ResourceState::Modified {
                from: format!("{:?}", stat.kind).to_lowercase(),
                to: "directory".to_string(),
            });
        }
        if self.ownership.matches(&stat) {
            Ok(self.desired_state())
        } else {
            Ok(ResourceState::Modified {
                from: describe_stat(&stat),
                to: self.ownership.describe(),
            })
        }
    }

    fn desired_state(&self) -> ResourceState {
        ResourceState::Present {
            details: Some(self.ownership.describe()),
        }
    }

    fn apply(&self, _ctx: &mut ApplyContext) -> Result<ApplyResult> {
        match self.fs.stat(&self.path)? {
            None => {
                self.fs.create_dir(&self.path, self.recursive)?;
                self.ownership.apply(self.fs.as_ref(), &self.path)?;
                Ok(ApplyResult::Created)
            }
            Some(stat) if stat.kind != FileKind::Dir => {
                bail!("{} exists and is not a directory", self.path.display())
            }
            Some(stat) => {
                if self.ownership.enforce(self.fs.as_ref(), &self.path, &stat)? {
                    Ok(ApplyResult::Modified)
                } else {
                    Ok(ApplyResult::NoChange)
                }
            }
        }
    }
}

//! Rendered configuration file resource

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;

use super::{ApplyContext, ApplyResult, Ownership, Resource, ResourceState, Trigger, describe_stat};
use crate::host::fetch::sha256_hex;
use crate::host::{FileKind, FileStat, Filesystem};

/// A file whose content was rendered before the pass began
///
/// With `content: None` the file must not exist and is deleted if found.
#[derive(Debug, Clone)]
pub struct TemplateFile {
    pub path: PathBuf,
    pub content: Option<String>,
    pub ownership: Ownership,
    triggers: Vec<Trigger>,
    fs: Arc<dyn Filesystem>,
}

/// Short content fingerprint for state reports
fn fingerprint(data: &[u8]) -> String {
    sha256_hex(data)[..12].to_string()
}

impl TemplateFile {
    pub fn present(
        path: impl Into<PathBuf>,
        content: String,
        ownership: Ownership,
        fs: Arc<dyn Filesystem>,
    ) -> Self {
        Self {
            path: path.into(),
            content: Some(content),
            ownership,
            triggers: Vec::new(),
            fs,
        }
    }

    pub fn absent(path: impl Into<PathBuf>, ownership: Ownership, fs: Arc<dyn Filesystem>) -> Self {
        Self {
            path: path.into(),
            content: None,
            ownership,
            triggers: Vec::new(),
            fs,
        }
    }

    /// Restart `service` whenever this file changes
    pub fn notifies(mut self, service: &str) -> Self {
        self.triggers.push(Trigger::restart(service));
        self
    }

    fn summary(&self, data: &[u8], ownership: &str) -> String {
        format!("{} {}", fingerprint(data), ownership)
    }

    fn on_disk(&self) -> Result<Option<(FileStat, Vec<u8>)>> {
        let Some(stat) = self.fs.stat(&self.path)? else {
            return Ok(None);
        };
        if stat.kind != FileKind::File {
            anyhow::bail!("{} exists and is not a regular file", self.path.display());
        }
        let data = self.fs.read(&self.path)?;
        Ok(Some((stat, data)))
    }
}

impl Resource for TemplateFile {
    fn id(&self) -> String {
        self.path.display().to_string()
    }

    fn description(&self) -> String {
        match self.content {
            Some(_) => format!("Render {} ({})", self.path.display(), self.ownership.describe()),
            None => format!("Remove {}", self.path.display()),
        }
    }

    fn resource_type(&self) -> &'static str {
        "template"
    }

    fn current_state(&self) -> Result<ResourceState> {
        let Some((stat, data)) = self.on_disk()? else {
            return Ok(ResourceState::Absent);
        };
        let Some(content) = &self.content else {
            return Ok(ResourceState::Present {
                details: Some(self.summary(&data, &describe_stat(&stat))),
            });
        };

        if data == content.as_bytes() && self.ownership.matches(&stat) {
            Ok(self.desired_state())
        } else {
            Ok(ResourceState::Modified {
                from: self.summary(&data, &describe_stat(&stat)),
                to: self.summary(content.as_bytes(), &self.ownership.describe()),
            })
        }
    }

    fn desired_state(&self) -> ResourceState {
        match &self.content {
            Some(content) => ResourceState::Present {
                details: Some(self.summary(content.as_bytes(), &self.ownership.describe())),
            },
            None => ResourceState::Absent,
        }
    }

    fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
        let existing = self.on_disk()?;

        let Some(content) = &self.content else {
            if existing.is_none() {
                return Ok(ApplyResult::NoChange);
            }
            self.fs.remove(&self.path)?;
            return Ok(ApplyResult::Removed);
        };

        match existing {
            None => {
                // Restrict permissions before the content lands
                self.fs.write(&self.path, b"")?;
                self.ownership.apply(self.fs.as_ref(), &self.path)?;
                self.fs.write(&self.path, content.as_bytes())?;
                Ok(ApplyResult::Created)
            }
            Some((stat, data)) => {
                let rewritten = data != content.as_bytes();
                if rewritten {
                    if ctx.verbose {
                        log::info!(
                            "{}: {} -> {}",
                            self.path.display(),
                            fingerprint(&data),
                            fingerprint(content.as_bytes())
                        );
                    }
                    self.fs.write(&self.path, content.as_bytes())?;
                }
                let reowned = self.ownership.enforce(self.fs.as_ref(), &self.path, &stat)?;
                if rewritten || reowned {
                    Ok(ApplyResult::Modified)
                } else {
                    Ok(ApplyResult::NoChange)
                }
            }
        }
    }

    fn triggers(&self) -> Vec<Trigger> {
        self.triggers.clone()
    }
}

//! Downloaded, checksum-verified file

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;

use super::{ApplyContext, ApplyResult, Ownership, Resource, ResourceState, describe_stat};
use crate::host::fetch::{self, Fetcher};
use crate::host::{FileStat, Filesystem};

/// A file fetched from `url` whose SHA-256 must equal `checksum`
///
/// The cached copy is trusted only while its digest matches; otherwise it
/// is downloaded again.
#[derive(Debug, Clone)]
pub struct RemoteFile {
    pub url: String,
    pub path: PathBuf,
    pub checksum: String,
    pub ownership: Ownership,
    fs: Arc<dyn Filesystem>,
    fetcher: Arc<dyn Fetcher>,
}

enum Cached {
    Missing,
    Stale(String),
    Valid(FileStat),
}

impl RemoteFile {
    pub fn new(
        url: &str,
        path: impl Into<PathBuf>,
        checksum: &str,
        ownership: Ownership,
        fs: Arc<dyn Filesystem>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        Self {
            url: url.to_string(),
            path: path.into(),
            checksum: checksum.trim().to_ascii_lowercase(),
            ownership,
            fs,
            fetcher,
        }
    }

    fn check_cached(&self) -> Result<Cached> {
        let Some(stat) = self.fs.stat(&self.path)? else {
            return Ok(Cached::Missing);
        };
        let digest = fetch::sha256_hex(&self.fs.read(&self.path)?);
        if digest == self.checksum {
            Ok(Cached::Valid(stat))
        } else {
            Ok(Cached::Stale(digest))
        }
    }

    fn download(&self) -> Result<()> {
        let data = self.fetcher.fetch(&self.url)?;
        fetch::verify_checksum(&self.url, &data, &self.checksum)?;

        if let Some(parent) = self.path.parent()
            && !self.fs.is_dir(parent)?
        {
            self.fs.create_dir(parent, true)?;
        }
        self.fs
            .write(&self.path, &data)
            .with_context(|| format!("Failed to store {}", self.url))?;
        self.ownership.apply(self.fs.as_ref(), &self.path)
    }
}

impl Resource for RemoteFile {
    fn id(&self) -> String {
        self.path.display().to_string()
    }

    fn description(&self) -> String {
        format!("Download {} to {}", self.url, self.path.display())
    }

    fn resource_type(&self) -> &'static str {
        "remote_file"
    }

    fn current_state(&self) -> Result<ResourceState> {
        match self.check_cached()? {
            Cached::Missing => Ok(ResourceState::Absent),
            Cached::Stale(digest) => Ok(ResourceState::Modified {
                from: format!("sha256 {digest}"),
                to: format!("sha256 {}", self.checksum),
            }),
            Cached::Valid(stat) if !self.ownership.matches(&stat) => Ok(ResourceState::Modified {
                from: describe_stat(&stat),
                to: self.ownership.describe(),
            }),
            Cached::Valid(_) => Ok(self.desired_state()),
        }
    }

    fn desired_state(&self) -> ResourceState {
        ResourceState::Present {
            details: Some(format!(
                "sha256 {} {}",
                self.checksum,
                self.ownership.describe()
            )),
        }
    }

    fn apply(&self, _ctx: &mut ApplyContext) -> Result<ApplyResult> {
        match self.check_cached()? {
            Cached::Missing => {
                self.download()?;
                Ok(ApplyResult::Created)
            }
            Cached::Stale(digest) => {
                log::warn!(
                    "{} has digest {digest}, expected {}; downloading again",
                    self.path.display(),
                    self.checksum
                );
                self.download()?;
                Ok(ApplyResult::Modified)
            }
            Cached::Valid(stat) => {
                if self.ownership.enforce(self.fs.as_ref(), &self.path, &stat)? {
                    Ok(ApplyResult::Modified)
                } else {
                    Ok(ApplyResult::NoChange)
                }
            }
        }
    }
}

//! Host capabilities
//!
//! Everything a pass needs from the machine it runs on. [`Host::local`]
//! wires the real implementations; tests build a [`Host`] from the
//! in-memory ones in `memory`.

pub mod accounts;
pub mod archive;
pub mod fetch;
pub mod fs;
#[cfg(test)]
pub mod memory;
pub mod service;

use std::path::Path;
use std::sync::Arc;

pub use accounts::{Accounts, SystemAccounts};
pub use fetch::{FetchError, Fetcher, HttpFetcher};
pub use fs::{FileKind, FileStat, Filesystem, LocalFs};
pub use service::{ServiceControl, SysvInit};

#[derive(Debug, Clone)]
pub struct Host {
    pub fs: Arc<dyn Filesystem>,
    pub accounts: Arc<dyn Accounts>,
    pub fetcher: Arc<dyn Fetcher>,
    pub services: Arc<dyn ServiceControl>,
}

impl Host {
    /// The machine this process runs on
    pub fn local(init_dir: &Path) -> Self {
        Self {
            fs: Arc::new(LocalFs),
            accounts: Arc::new(SystemAccounts),
            fetcher: Arc::new(HttpFetcher::new()),
            services: Arc::new(SysvInit::new(init_dir)),
        }
    }
}

//! In-memory host for convergence tests

use anyhow::{Context, Result, bail};
use declarative::{ServiceAction, ServiceStatus};
use flate2::Compression;
use flate2::write::GzEncoder;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::fetch::{FetchError, Fetcher};
use super::fs::{FileKind, FileStat, Filesystem};
use super::{Accounts, Host, ServiceControl};

#[derive(Debug, Clone)]
enum Content {
    File(Vec<u8>),
    Dir,
    Symlink(PathBuf),
}

#[derive(Debug, Clone)]
struct Node {
    content: Content,
    owner: String,
    group: String,
    mode: u32,
}

impl Node {
    fn new(content: Content) -> Self {
        let mode = match content {
            Content::Dir => 0o755,
            Content::File(_) => 0o644,
            Content::Symlink(_) => 0o777,
        };
        Self {
            content,
            owner: "root".into(),
            group: "root".into(),
            mode,
        }
    }
}

/// Filesystem held in a map; `/` always exists
#[derive(Debug, Default)]
pub struct MemoryFs {
    nodes: Mutex<BTreeMap<PathBuf, Node>>,
    mutations: AtomicUsize,
}

impl MemoryFs {
    fn touch(&self) {
        self.mutations.fetch_add(1, Ordering::SeqCst);
    }

    /// Number of mutating calls so far
    pub fn mutation_count(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }

    fn parent_is_dir(nodes: &BTreeMap<PathBuf, Node>, path: &Path) -> bool {
        match path.parent() {
            None => true,
            Some(parent) if parent == Path::new("/") => true,
            Some(parent) => nodes
                .get(parent)
                .is_some_and(|n| matches!(n.content, Content::Dir)),
        }
    }

    /// Place a file, creating missing parents (simulates outside changes)
    pub fn put_file(&self, path: &Path, contents: &[u8]) {
        let mut nodes = self.nodes.lock().unwrap();
        for ancestor in path.ancestors().skip(1) {
            if ancestor != Path::new("/") && !ancestor.as_os_str().is_empty() {
                nodes
                    .entry(ancestor.to_path_buf())
                    .or_insert_with(|| Node::new(Content::Dir));
            }
        }
        nodes.insert(path.to_path_buf(), Node::new(Content::File(contents.to_vec())));
    }

    pub fn contents(&self, path: &Path) -> Option<String> {
        match &self.nodes.lock().unwrap().get(path)?.content {
            Content::File(data) => Some(String::from_utf8_lossy(data).into_owned()),
            _ => None,
        }
    }
}

impl Filesystem for MemoryFs {
    fn stat(&self, path: &Path) -> Result<Option<FileStat>> {
        let nodes = self.nodes.lock().unwrap();
        Ok(nodes.get(path).map(|node| FileStat {
            kind: match node.content {
                Content::File(_) => FileKind::File,
                Content::Dir => FileKind::Dir,
                Content::Symlink(_) => FileKind::Symlink,
            },
            owner: node.owner.clone(),
            group: node.group.clone(),
            mode: node.mode,
        }))
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let nodes = self.nodes.lock().unwrap();
        match nodes.get(path).map(|n| &n.content) {
            Some(Content::File(data)) => Ok(data.clone()),
            Some(_) => bail!("{} is not a file", path.display()),
            None => bail!("{} does not exist", path.display()),
        }
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        let mut nodes = self.nodes.lock().unwrap();
        if !Self::parent_is_dir(&nodes, path) {
            bail!("Failed to write {}: parent directory missing", path.display());
        }
        match nodes.get_mut(path) {
            Some(node) if matches!(node.content, Content::File(_)) => {
                node.content = Content::File(contents.to_vec());
            }
            Some(_) => bail!("Failed to write {}: not a file", path.display()),
            None => {
                nodes.insert(path.to_path_buf(), Node::new(Content::File(contents.to_vec())));
            }
        }
        self.touch();
        Ok(())
    }

    fn create_dir(&self, path: &Path, recursive: bool) -> Result<()> {
        let mut nodes = self.nodes.lock().unwrap();
        if nodes.contains_key(path) {
            if recursive && matches!(nodes[path].content, Content::Dir) {
                return Ok(());
            }
            bail!("Failed to create directory {}: exists", path.display());
        }
        if recursive {
            let missing: Vec<PathBuf> = path
                .ancestors()
                .filter(|a| *a != Path::new("/") && !a.as_os_str().is_empty())
                .filter(|a| !nodes.contains_key(*a))
                .map(Path::to_path_buf)
                .collect();
            for dir in missing.into_iter().rev() {
                nodes.insert(dir, Node::new(Content::Dir));
            }
        } else {
            if !Self::parent_is_dir(&nodes, path) {
                bail!("Failed to create directory {}: parent missing", path.display());
            }
            nodes.insert(path.to_path_buf(), Node::new(Content::Dir));
        }
        self.touch();
        Ok(())
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let nodes = self.nodes.lock().unwrap();
        if !matches!(nodes.get(path).map(|n| &n.content), Some(Content::Dir)) {
            bail!("Failed to list {}", path.display());
        }
        Ok(nodes
            .keys()
            .filter(|p| p.parent() == Some(path))
            .cloned()
            .collect())
    }

    fn remove(&self, path: &Path) -> Result<()> {
        let mut nodes = self.nodes.lock().unwrap();
        if nodes.remove(path).is_none() {
            bail!("Failed to remove {}: not found", path.display());
        }
        nodes.retain(|p, _| !p.starts_with(path));
        self.touch();
        Ok(())
    }

    fn read_link(&self, path: &Path) -> Result<PathBuf> {
        let nodes = self.nodes.lock().unwrap();
        match nodes.get(path).map(|n| &n.content) {
            Some(Content::Symlink(target)) => Ok(target.clone()),
            _ => bail!("{} is not a symlink", path.display()),
        }
    }

    fn symlink(&self, target: &Path, link: &Path) -> Result<()> {
        let mut nodes = self.nodes.lock().unwrap();
        if nodes.contains_key(link) || !Self::parent_is_dir(&nodes, link) {
            bail!("Failed to create symlink {}", link.display());
        }
        nodes.insert(
            link.to_path_buf(),
            Node::new(Content::Symlink(target.to_path_buf())),
        );
        self.touch();
        Ok(())
    }

    fn set_owner(&self, path: &Path, owner: &str, group: &str) -> Result<()> {
        let mut nodes = self.nodes.lock().unwrap();
        let node = nodes
            .get_mut(path)
            .with_context(|| format!("Failed to chown {}", path.display()))?;
        node.owner = owner.to_string();
        node.group = group.to_string();
        self.touch();
        Ok(())
    }

    fn set_mode(&self, path: &Path, mode: u32) -> Result<()> {
        let mut nodes = self.nodes.lock().unwrap();
        let node = nodes
            .get_mut(path)
            .with_context(|| format!("Failed to chmod {}", path.display()))?;
        node.mode = mode;
        self.touch();
        Ok(())
    }
}

/// Account database seeded with `root`
#[derive(Debug)]
pub struct MemoryAccounts {
    users: Mutex<BTreeMap<String, String>>,
    groups: Mutex<BTreeSet<String>>,
}

impl Default for MemoryAccounts {
    fn default() -> Self {
        Self {
            users: Mutex::new(BTreeMap::from([("root".to_string(), "root".to_string())])),
            groups: Mutex::new(BTreeSet::from(["root".to_string()])),
        }
    }
}

impl MemoryAccounts {
    /// Primary group of a user
    pub fn primary_group(&self, user: &str) -> Option<String> {
        self.users.lock().unwrap().get(user).cloned()
    }
}

impl Accounts for MemoryAccounts {
    fn group_exists(&self, name: &str) -> Result<bool> {
        Ok(self.groups.lock().unwrap().contains(name))
    }

    fn user_exists(&self, name: &str) -> Result<bool> {
        Ok(self.users.lock().unwrap().contains_key(name))
    }

    fn create_group(&self, name: &str) -> Result<()> {
        if !self.groups.lock().unwrap().insert(name.to_string()) {
            bail!("groupadd: group '{name}' already exists");
        }
        Ok(())
    }

    fn create_user(&self, name: &str, group: &str, _shell: &str) -> Result<()> {
        if !self.groups.lock().unwrap().contains(group) {
            bail!("useradd: group '{group}' does not exist");
        }
        let mut users = self.users.lock().unwrap();
        if users.contains_key(name) {
            bail!("useradd: user '{name}' already exists");
        }
        users.insert(name.to_string(), group.to_string());
        Ok(())
    }
}

/// Serves archives from memory and counts downloads
#[derive(Debug, Default)]
pub struct MockFetcher {
    assets: Mutex<HashMap<String, Vec<u8>>>,
    calls: AtomicUsize,
}

impl MockFetcher {
    pub fn add_asset(&self, url: impl Into<String>, data: Vec<u8>) {
        self.assets.lock().unwrap().insert(url.into(), data);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Fetcher for MockFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.assets
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Http {
                url: url.to_string(),
                message: "HTTP 404".to_string(),
                status: Some(404),
            })
    }
}

/// Records every service action and tracks the resulting status
#[derive(Debug, Default)]
pub struct RecordingServices {
    status: Mutex<HashMap<String, ServiceStatus>>,
    actions: Mutex<Vec<(String, ServiceAction)>>,
}

impl RecordingServices {
    pub fn set_status(&self, name: &str, status: ServiceStatus) {
        self.status.lock().unwrap().insert(name.to_string(), status);
    }

    pub fn actions(&self) -> Vec<(String, ServiceAction)> {
        self.actions.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.actions.lock().unwrap().clear();
    }
}

impl ServiceControl for RecordingServices {
    fn status(&self, name: &str) -> Result<ServiceStatus> {
        Ok(self
            .status
            .lock()
            .unwrap()
            .get(name)
            .copied()
            .unwrap_or_default())
    }

    fn run(&self, name: &str, action: ServiceAction) -> Result<()> {
        self.actions
            .lock()
            .unwrap()
            .push((name.to_string(), action));

        let mut status = self.status.lock().unwrap();
        let entry = status.entry(name.to_string()).or_default();
        match action {
            ServiceAction::Enable => entry.enabled = true,
            ServiceAction::Start | ServiceAction::Restart => entry.running = true,
            ServiceAction::Stop => entry.running = false,
        }
        Ok(())
    }
}

/// Handles to every in-memory capability behind one [`Host`]
#[derive(Debug, Clone, Default)]
pub struct TestHost {
    pub fs: Arc<MemoryFs>,
    pub accounts: Arc<MemoryAccounts>,
    pub fetcher: Arc<MockFetcher>,
    pub services: Arc<RecordingServices>,
}

impl TestHost {
    pub fn host(&self) -> Host {
        Host {
            fs: self.fs.clone(),
            accounts: self.accounts.clone(),
            fetcher: self.fetcher.clone(),
            services: self.services.clone(),
        }
    }
}

/// A small Tomcat-shaped distribution archive
pub fn sample_distribution(version: &str) -> Vec<u8> {
    let root = format!("apache-tomcat-{version}");
    let dirs = ["", "bin", "conf", "lib", "logs", "temp", "work", "webapps"];
    let files: [(&str, &[u8], u32); 13] = [
        ("bin/catalina.sh", b"#!/bin/sh\n", 0o755),
        ("bin/startup.sh", b"#!/bin/sh\n", 0o755),
        ("bin/catalina.bat", b"@echo off\r\n", 0o644),
        ("bin/bootstrap.jar", b"PK", 0o644),
        ("conf/server.xml", b"<Server/>", 0o600),
        ("conf/web.xml", b"<web-app/>", 0o600),
        ("conf/logging.properties", b"handlers = java.util.logging.ConsoleHandler\n", 0o600),
        ("lib/catalina.jar", b"PK", 0o644),
        ("logs/.keep", b"", 0o644),
        ("webapps/ROOT/index.jsp", b"<html/>", 0o644),
        ("webapps/docs/index.html", b"<html/>", 0o644),
        ("webapps/examples/index.html", b"<html/>", 0o644),
        ("webapps/manager/index.jsp", b"<html/>", 0o644),
    ];

    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for dir in dirs {
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Directory);
        header.set_size(0);
        header.set_mode(0o755);
        header.set_cksum();
        let path = format!("{root}/{dir}");
        builder
            .append_data(&mut header, path.trim_end_matches('/'), std::io::empty())
            .unwrap();
    }
    for (path, data, mode) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(mode);
        header.set_cksum();
        builder
            .append_data(&mut header, format!("{root}/{path}"), data)
            .unwrap();
    }

    builder.into_inner().unwrap().finish().unwrap()
}

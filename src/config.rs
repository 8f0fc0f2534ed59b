//! Instance configuration
//!
//! One file describes one Tomcat instance. It is loaded once per run,
//! validated before any resource is built, and never mutated afterwards.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::attributes::Attributes;

/// Errors raised while loading or validating a configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration in {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("log_dir must be absolute if specified (got {0})")]
    RelativeLogDir(PathBuf),

    #[error("home must be an absolute path (got {0})")]
    RelativeHome(PathBuf),
}

/// Full description of one Tomcat instance
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstanceConfig {
    /// Install root (CATALINA_HOME)
    pub home: PathBuf,
    /// Init service name; defaults to the basename of `home`
    #[serde(default)]
    pub service_name: Option<String>,
    #[serde(default = "default_user")]
    pub user: String,
    #[serde(default = "default_group")]
    pub group: String,

    pub version: String,
    /// Base URL; the archive is fetched from `<mirror>/<version>/tomcat-<version>.tar.gz`
    pub mirror: String,
    /// SHA-256 of the archive, hex encoded
    pub checksum: String,
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    #[serde(default)]
    pub http_port: Option<u16>,
    #[serde(default)]
    pub ssl_port: Option<u16>,
    #[serde(default)]
    pub ajp_port: Option<u16>,
    #[serde(default = "default_shutdown_port")]
    pub shutdown_port: u16,

    #[serde(default)]
    pub jmx_port: Option<u16>,
    /// Only an explicit `false` disables JMX authentication
    #[serde(default)]
    pub jmx_authenticate: Option<bool>,
    #[serde(default)]
    pub jmx_control_password: Option<String>,
    #[serde(default)]
    pub jmx_monitor_password: Option<String>,

    #[serde(default)]
    pub pool_enabled: bool,
    #[serde(default)]
    pub pool_additional: Attributes,
    #[serde(default)]
    pub http_additional: Attributes,
    #[serde(default)]
    pub ssl_additional: Attributes,
    #[serde(default)]
    pub ajp_additional: Attributes,

    /// Valve className -> attributes, attached to the Engine
    #[serde(default)]
    pub engine_valves: BTreeMap<String, Attributes>,
    /// Valve className -> attributes, attached to the Host
    #[serde(default)]
    pub host_valves: BTreeMap<String, Attributes>,

    #[serde(default)]
    pub access_log_enabled: bool,
    #[serde(default)]
    pub access_log_additional: Attributes,

    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    #[serde(default = "default_logrotate_frequency")]
    pub logrotate_frequency: String,
    #[serde(default = "default_logrotate_count")]
    pub logrotate_count: u32,

    #[serde(default)]
    pub java_home: Option<PathBuf>,
    #[serde(default)]
    pub java_opts: Option<String>,
    #[serde(default)]
    pub catalina_opts: Option<String>,

    /// Seconds the init script waits for shutdown before killing the JVM
    #[serde(default = "default_kill_delay")]
    pub kill_delay: u32,
    #[serde(default = "default_true")]
    pub start_service: bool,

    #[serde(default = "default_init_dir")]
    pub init_dir: PathBuf,
    #[serde(default = "default_logrotate_dir")]
    pub logrotate_dir: PathBuf,

    #[serde(default)]
    pub templates: TemplateSources,
}

/// Per-file template overrides: a directory holding `<name>.hbs`
/// replaces the built-in template of that name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplateSources {
    #[serde(default)]
    pub init: Option<PathBuf>,
    #[serde(default)]
    pub setenv: Option<PathBuf>,
    #[serde(default)]
    pub server_xml: Option<PathBuf>,
    #[serde(default)]
    pub logging_properties: Option<PathBuf>,
    #[serde(default)]
    pub logrotate: Option<PathBuf>,
}

fn default_user() -> String {
    "tomcat".to_string()
}

fn default_group() -> String {
    "tomcat".to_string()
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("/var/cache/tomcat-bin")
}

fn default_shutdown_port() -> u16 {
    8005
}

fn default_logrotate_frequency() -> String {
    "weekly".to_string()
}

fn default_logrotate_count() -> u32 {
    4
}

fn default_kill_delay() -> u32 {
    10
}

fn default_true() -> bool {
    true
}

fn default_init_dir() -> PathBuf {
    PathBuf::from("/etc/init.d")
}

fn default_logrotate_dir() -> PathBuf {
    PathBuf::from("/etc/logrotate.d")
}

impl InstanceConfig {
    /// Load a configuration file (TOML, or JSON for `.json` files)
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let parsed = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content).map_err(|e| e.to_string())
        } else {
            toml::from_str(&content).map_err(|e| e.to_string())
        };

        parsed.map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })
    }

    /// Check invariants that must hold before any resource is built
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.home.is_absolute() {
            return Err(ConfigError::RelativeHome(self.home.clone()));
        }
        if let Some(log_dir) = &self.log_dir
            && !log_dir.is_absolute()
        {
            return Err(ConfigError::RelativeLogDir(log_dir.clone()));
        }
        Ok(())
    }

    pub fn service_name(&self) -> String {
        self.service_name.clone().unwrap_or_else(|| {
            self.home
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "tomcat".to_string())
        })
    }

    /// Where logs are written: `log_dir` if set, else `<home>/logs`
    pub fn log_dir(&self) -> PathBuf {
        self.log_dir
            .clone()
            .unwrap_or_else(|| self.home.join("logs"))
    }

    pub fn download_url(&self) -> String {
        format!(
            "{}/{}/tomcat-{}.tar.gz",
            self.mirror, self.version, self.version
        )
    }

    /// Local path of the downloaded archive
    pub fn tarball_path(&self) -> PathBuf {
        let url = self.download_url();
        let name = url.rsplit('/').next().unwrap_or(url.as_str());
        self.cache_dir.join(name)
    }

    /// Whether the JMX access and password files should exist
    pub fn jmx_files_enabled(&self) -> bool {
        self.jmx_port.is_some() && self.jmx_authenticate != Some(false)
    }
}

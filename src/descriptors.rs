//! Desired-state builder
//!
//! Pure functions from an [`InstanceConfig`] to the connector, pool and
//! valve descriptors rendered into `server.xml`. Each descriptor starts from
//! fixed defaults and is then overlaid with the operator's additional
//! properties. A disabled feature yields `None`, never an empty map.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::attributes::Attributes;
use crate::config::InstanceConfig;

const POOL_NAME: &str = "tomcatThreadPool";
const ACCESS_LOG_VALVE: &str = "org.apache.catalina.valves.AccessLogValve";

/// Log files rotated for every instance
const DEFAULT_LOGS: [&str; 5] = [
    "catalina.out",
    "catalina.log",
    "manager.log",
    "host-manager.log",
    "localhost.log",
];

pub fn thread_pool(config: &InstanceConfig) -> Option<Attributes> {
    if !config.pool_enabled {
        return None;
    }
    let pool = Attributes::from([("name", POOL_NAME), ("namePrefix", "catalina-exec-")]);
    Some(pool.overlay(&config.pool_additional))
}

/// Attributes shared by the HTTP and SSL connectors
fn http_base(port: u16, pool: Option<&Attributes>) -> Attributes {
    let mut attrs = Attributes::from([
        ("protocol", "HTTP/1.1"),
        ("connectionTimeout", "20000"),
        ("URIEncoding", "UTF-8"),
    ]);
    attrs.set("port", port);
    if let Some(name) = pool.and_then(|p| p.get("name")) {
        attrs.set("executor", name);
    }
    attrs
}

pub fn http_connector(config: &InstanceConfig) -> Option<Attributes> {
    let port = config.http_port?;
    let pool = thread_pool(config);

    let mut http = http_base(port, pool.as_ref());
    if let Some(ssl_port) = config.ssl_port {
        http.set("redirectPort", ssl_port);
    }
    Some(http.overlay(&config.http_additional))
}

pub fn ssl_connector(config: &InstanceConfig) -> Option<Attributes> {
    let port = config.ssl_port?;
    let pool = thread_pool(config);

    let mut ssl = http_base(port, pool.as_ref());
    ssl.set("SSLEnabled", "true");
    ssl.set("scheme", "https");
    ssl.set("secure", "true");
    ssl.set("sslProtocol", "TLS");
    ssl.set("clientAuth", "false");
    Some(ssl.overlay(&config.ssl_additional))
}

pub fn ajp_connector(config: &InstanceConfig) -> Option<Attributes> {
    let port = config.ajp_port?;

    let mut ajp = Attributes::from([("protocol", "AJP/1.3"), ("URIEncoding", "UTF-8")]);
    ajp.set("port", port);
    if let Some(ssl_port) = config.ssl_port {
        ajp.set("redirectPort", ssl_port);
    }
    Some(ajp.overlay(&config.ajp_additional))
}

pub fn access_log_valve(config: &InstanceConfig) -> Option<Attributes> {
    if !config.access_log_enabled {
        return None;
    }
    let valve = Attributes::from([
        ("className", ACCESS_LOG_VALVE),
        ("prefix", "localhost_access_log"),
        ("suffix", ".log"),
        ("rotatable", "false"),
        ("pattern", "common"),
        ("directory", "logs"),
    ]);
    Some(valve.overlay(&config.access_log_additional))
}

/// Everything derived from the configuration for one run
#[derive(Debug, Clone, Serialize)]
pub struct DesiredState {
    pub service_name: String,
    pub log_dir: PathBuf,
    pub thread_pool: Option<Attributes>,
    pub http: Option<Attributes>,
    pub ssl: Option<Attributes>,
    pub ajp: Option<Attributes>,
    pub access_log_valve: Option<Attributes>,
    pub engine_valves: BTreeMap<String, Attributes>,
    pub host_valves: BTreeMap<String, Attributes>,
    /// Files listed in the logrotate configuration
    pub log_paths: Vec<PathBuf>,
}

impl DesiredState {
    pub fn build(config: &InstanceConfig) -> Self {
        let access_log_valve = access_log_valve(config);
        let log_paths = log_paths(config, access_log_valve.as_ref());

        Self {
            service_name: config.service_name(),
            log_dir: config.log_dir(),
            thread_pool: thread_pool(config),
            http: http_connector(config),
            ssl: ssl_connector(config),
            ajp: ajp_connector(config),
            access_log_valve,
            engine_valves: config.engine_valves.clone(),
            host_valves: config.host_valves.clone(),
            log_paths,
        }
    }
}

/// Rotated logs live under `<home>/logs`, which is either the real log
/// directory or the symlink to it
fn log_paths(config: &InstanceConfig, valve: Option<&Attributes>) -> Vec<PathBuf> {
    let logs = config.home.join("logs");
    let mut paths: Vec<PathBuf> = DEFAULT_LOGS.iter().map(|name| logs.join(name)).collect();

    if let Some(valve) = valve {
        let prefix = valve.get("prefix").unwrap_or_default();
        let suffix = valve.get("suffix").unwrap_or_default();
        paths.push(logs.join(format!("{prefix}{suffix}")));
    }
    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::minimal;

    fn app1() -> InstanceConfig {
        let mut config = minimal("/opt/app1");
        config.user = "app1".into();
        config.group = "app1".into();
        config.http_port = Some(8080);
        config.pool_enabled = true;
        config
    }

    #[test]
    fn http_connector_with_pool() {
        let http = http_connector(&app1()).unwrap();

        assert_eq!(
            http,
            Attributes::from([
                ("port", "8080"),
                ("protocol", "HTTP/1.1"),
                ("connectionTimeout", "20000"),
                ("URIEncoding", "UTF-8"),
                ("executor", "tomcatThreadPool"),
            ])
        );
    }

    #[test]
    fn thread_pool_defaults() {
        assert_eq!(
            thread_pool(&app1()).unwrap(),
            Attributes::from([("name", "tomcatThreadPool"), ("namePrefix", "catalina-exec-")])
        );
    }

    #[test]
    fn no_ports_means_no_connectors() {
        let config = minimal("/opt/app1");

        assert!(http_connector(&config).is_none());
        assert!(ssl_connector(&config).is_none());
        assert!(ajp_connector(&config).is_none());
        assert!(thread_pool(&config).is_none());
        assert!(access_log_valve(&config).is_none());
    }

    #[test]
    fn ssl_port_adds_redirects() {
        let mut config = app1();
        config.ssl_port = Some(8443);
        config.ajp_port = Some(8009);

        let http = http_connector(&config).unwrap();
        assert_eq!(http.get("redirectPort"), Some("8443"));

        let ajp = ajp_connector(&config).unwrap();
        assert_eq!(ajp.get("redirectPort"), Some("8443"));
        assert_eq!(ajp.get("protocol"), Some("AJP/1.3"));
        assert!(ajp.get("executor").is_none());

        let ssl = ssl_connector(&config).unwrap();
        assert!(ssl.get("redirectPort").is_none());
        assert_eq!(ssl.get("executor"), Some("tomcatThreadPool"));
    }

    #[test]
    fn ssl_connector_is_ssl_enabled_unless_overridden() {
        let mut config = minimal("/opt/app1");
        config.ssl_port = Some(8443);

        let ssl = ssl_connector(&config).unwrap();
        assert_eq!(ssl.get("SSLEnabled"), Some("true"));
        assert_eq!(ssl.get("scheme"), Some("https"));
        assert_eq!(ssl.get("secure"), Some("true"));
        assert_eq!(ssl.get("sslProtocol"), Some("TLS"));
        assert_eq!(ssl.get("clientAuth"), Some("false"));

        config.ssl_additional = Attributes::from([("SSLEnabled", "false")]);
        let ssl = ssl_connector(&config).unwrap();
        assert_eq!(ssl.get("SSLEnabled"), Some("false"));
    }

    #[test]
    fn overlay_may_replace_structural_fields() {
        let mut config = app1();
        config.http_additional =
            Attributes::from([("protocol", "org.apache.coyote.http11.Http11NioProtocol")]);

        let http = http_connector(&config).unwrap();
        assert_eq!(
            http.get("protocol"),
            Some("org.apache.coyote.http11.Http11NioProtocol")
        );
        assert_eq!(http.get("port"), Some("8080"));
    }

    #[test]
    fn executor_follows_renamed_pool() {
        let mut config = app1();
        config.pool_additional = Attributes::from([("name", "sharedPool"), ("maxThreads", "300")]);

        let http = http_connector(&config).unwrap();
        assert_eq!(http.get("executor"), Some("sharedPool"));
        assert_eq!(thread_pool(&config).unwrap().get("maxThreads"), Some("300"));
    }

    #[test]
    fn access_log_suffix_override_tracks_log_path() {
        let mut config = minimal("/opt/app1");
        config.access_log_enabled = true;
        config.access_log_additional = Attributes::from([("suffix", ".txt")]);

        let desired = DesiredState::build(&config);
        let valve = desired.access_log_valve.as_ref().unwrap();
        assert_eq!(valve.get("suffix"), Some(".txt"));
        assert_eq!(valve.get("className"), Some(ACCESS_LOG_VALVE));

        assert_eq!(desired.log_paths.len(), 6);
        assert_eq!(
            desired.log_paths.last().unwrap(),
            &PathBuf::from("/opt/app1/logs/localhost_access_log.txt")
        );
    }

    #[test]
    fn default_log_paths_under_home() {
        let mut config = minimal("/opt/app1");
        config.log_dir = Some("/var/log/app1".into());

        let desired = DesiredState::build(&config);
        assert_eq!(desired.log_dir, PathBuf::from("/var/log/app1"));
        assert_eq!(desired.service_name, "app1");
        assert_eq!(
            desired.log_paths,
            DEFAULT_LOGS
                .iter()
                .map(|n| PathBuf::from("/opt/app1/logs").join(n))
                .collect::<Vec<_>>()
        );
    }
}

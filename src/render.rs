//! Template rendering
//!
//! Built-in templates are compiled into the binary. An override directory
//! configured for a template replaces the built-in by file name.

use anyhow::{Context, Result};
use handlebars::Handlebars;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::attributes::Attributes;
use crate::config::{InstanceConfig, TemplateSources};
use crate::host::Filesystem;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    Init,
    Setenv,
    ServerXml,
    JmxAccess,
    JmxPassword,
    LoggingProperties,
    Logrotate,
}

/// How substituted values are escaped
///
/// Markup escaping emits only entity and numeric character references,
/// all of which are valid inside XML attribute values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Escape {
    Xml,
    Raw,
}

impl Template {
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Init => "tomcat.init.hbs",
            Self::Setenv => "setenv.sh.hbs",
            Self::ServerXml => "server.xml.hbs",
            Self::JmxAccess => "jmxremote.access.hbs",
            Self::JmxPassword => "jmxremote.password.hbs",
            Self::LoggingProperties => "logging.properties.hbs",
            Self::Logrotate => "logrotate.hbs",
        }
    }

    fn builtin(&self) -> &'static str {
        match self {
            Self::Init => include_str!("../templates/tomcat.init.hbs"),
            Self::Setenv => include_str!("../templates/setenv.sh.hbs"),
            Self::ServerXml => include_str!("../templates/server.xml.hbs"),
            Self::JmxAccess => include_str!("../templates/jmxremote.access.hbs"),
            Self::JmxPassword => include_str!("../templates/jmxremote.password.hbs"),
            Self::LoggingProperties => include_str!("../templates/logging.properties.hbs"),
            Self::Logrotate => include_str!("../templates/logrotate.hbs"),
        }
    }

    fn escape(&self) -> Escape {
        match self {
            Self::ServerXml => Escape::Xml,
            _ => Escape::Raw,
        }
    }

    /// The JMX files always use the built-in templates
    fn override_dir<'a>(&self, sources: &'a TemplateSources) -> Option<&'a Path> {
        let dir = match self {
            Self::Init => &sources.init,
            Self::Setenv => &sources.setenv,
            Self::ServerXml => &sources.server_xml,
            Self::LoggingProperties => &sources.logging_properties,
            Self::Logrotate => &sources.logrotate,
            Self::JmxAccess | Self::JmxPassword => return None,
        };
        dir.as_deref()
    }
}

/// Renders templates, reading overrides through the host filesystem
pub struct Renderer<'a> {
    fs: &'a dyn Filesystem,
    sources: &'a TemplateSources,
}

impl<'a> Renderer<'a> {
    pub fn new(fs: &'a dyn Filesystem, sources: &'a TemplateSources) -> Self {
        Self { fs, sources }
    }

    fn source(&self, template: Template) -> Result<String> {
        let Some(dir) = template.override_dir(self.sources) else {
            return Ok(template.builtin().to_string());
        };
        let path = dir.join(template.file_name());
        let bytes = self.fs.read(&path)?;
        log::debug!("Using template override {}", path.display());
        String::from_utf8(bytes).with_context(|| format!("{} is not UTF-8", path.display()))
    }

    pub fn render<T: Serialize>(&self, template: Template, data: &T) -> Result<String> {
        let source = self.source(template)?;

        let mut handlebars = Handlebars::new();
        match template.escape() {
            Escape::Xml => handlebars.register_escape_fn(handlebars::html_escape),
            Escape::Raw => handlebars.register_escape_fn(handlebars::no_escape),
        }

        handlebars
            .render_template(&source, data)
            .with_context(|| format!("Failed to render {}", template.file_name()))
    }
}

// Variables passed to each template

#[derive(Debug, Serialize)]
pub struct InitVars<'a> {
    pub tomcat_home: &'a Path,
    pub tomcat_user: &'a str,
    pub tomcat_name: &'a str,
    pub kill_delay: u32,
}

#[derive(Debug, Serialize)]
pub struct SetenvVars<'a> {
    pub config: &'a InstanceConfig,
    pub catalina_pid: PathBuf,
    pub jmx_port: Option<u16>,
    pub jmx_authenticate: bool,
    pub jmx_access_file: PathBuf,
    pub jmx_password_file: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct ServerXmlVars<'a> {
    pub shutdown_port: u16,
    pub thread_pool: Option<&'a Attributes>,
    pub http: Option<&'a Attributes>,
    pub ssl: Option<&'a Attributes>,
    pub ajp: Option<&'a Attributes>,
    pub engine_valves: &'a std::collections::BTreeMap<String, Attributes>,
    pub host_valves: &'a std::collections::BTreeMap<String, Attributes>,
    pub access_log_valve: Option<&'a Attributes>,
}

#[derive(Debug, Serialize)]
pub struct JmxPasswordVars<'a> {
    pub control_password: Option<&'a str>,
    pub monitor_password: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct LogrotateVars<'a> {
    pub files: &'a [PathBuf],
    pub frequency: &'a str,
    pub rotate: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::minimal;
    use crate::descriptors::DesiredState;
    use crate::host::memory::MemoryFs;
    use std::collections::BTreeMap;

    fn server_xml(config: &InstanceConfig) -> String {
        let fs = MemoryFs::default();
        let desired = DesiredState::build(config);
        let vars = ServerXmlVars {
            shutdown_port: config.shutdown_port,
            thread_pool: desired.thread_pool.as_ref(),
            http: desired.http.as_ref(),
            ssl: desired.ssl.as_ref(),
            ajp: desired.ajp.as_ref(),
            engine_valves: &desired.engine_valves,
            host_valves: &desired.host_valves,
            access_log_valve: desired.access_log_valve.as_ref(),
        };
        Renderer::new(&fs, &config.templates)
            .render(Template::ServerXml, &vars)
            .unwrap()
    }

    #[test]
    fn server_xml_without_ports_has_no_connectors() {
        let xml = server_xml(&minimal("/opt/app1"));

        assert!(xml.contains(r#"<Server port="8005" shutdown="SHUTDOWN">"#));
        assert!(!xml.contains("<Connector"));
        assert!(!xml.contains("<Executor"));
        assert!(!xml.contains("protocol="));
        assert!(!xml.contains("redirectPort"));
    }

    #[test]
    fn server_xml_renders_connectors_and_valves() {
        let mut config = minimal("/opt/app1");
        config.http_port = Some(8080);
        config.pool_enabled = true;
        config.access_log_enabled = true;
        config.engine_valves = BTreeMap::from([(
            "org.apache.catalina.valves.RemoteIpValve".to_string(),
            Attributes::from([("internalProxies", "10\\.0\\..*")]),
        )]);

        let xml = server_xml(&config);
        assert!(xml.contains(
            r#"<Executor name="tomcatThreadPool" namePrefix="catalina-exec-" />"#
        ));
        assert!(xml.contains(
            r#"<Connector URIEncoding="UTF-8" connectionTimeout="20000" executor="tomcatThreadPool" port="8080" protocol="HTTP/1.1" />"#
        ));
        assert!(xml.contains(
            r#"<Valve className="org.apache.catalina.valves.RemoteIpValve" internalProxies="10\.0\..*" />"#
        ));
        assert!(xml.contains(r#"className="org.apache.catalina.valves.AccessLogValve""#));
    }

    #[test]
    fn server_xml_escapes_attribute_values() {
        let mut config = minimal("/opt/app1");
        config.access_log_enabled = true;
        config.access_log_additional = Attributes::from([("pattern", r#"%h "%r" <%s> & %b"#)]);

        let xml = server_xml(&config);
        assert!(xml.contains(r#"pattern="%h &quot;%r&quot; &lt;%s&gt; &amp; %b""#));
    }

    #[test]
    fn server_xml_escapes_quotes_as_character_references() {
        let mut config = minimal("/opt/app1");
        config.access_log_enabled = true;
        config.access_log_additional = Attributes::from([("pattern", "%h '%r' a=b")]);

        let xml = server_xml(&config);
        assert!(xml.contains(r#"pattern="%h &#x27;%r&#x27; a&#x3D;b""#));
    }

    #[test]
    fn shell_templates_are_not_escaped() {
        let fs = MemoryFs::default();
        let mut config = minimal("/opt/app1");
        config.java_opts = Some(r#"-Xmx512m -Dfoo="a&b""#.to_string());

        let vars = SetenvVars {
            config: &config,
            catalina_pid: PathBuf::from("/var/run/app1.pid"),
            jmx_port: None,
            jmx_authenticate: false,
            jmx_access_file: PathBuf::new(),
            jmx_password_file: PathBuf::new(),
        };
        let setenv = Renderer::new(&fs, &config.templates)
            .render(Template::Setenv, &vars)
            .unwrap();

        assert!(setenv.contains(r#"JAVA_OPTS="-Xmx512m -Dfoo="a&b"""#));
        assert!(setenv.contains(r#"CATALINA_PID="/var/run/app1.pid""#));
        assert!(!setenv.contains("jmxremote"));
    }

    #[test]
    fn override_directory_replaces_builtin() {
        let fs = MemoryFs::default();
        fs.put_file(
            Path::new("/srv/templates/logrotate.hbs"),
            b"{{#each files}}{{this}} {{/each}}{{frequency}}/{{rotate}}",
        );
        let sources = TemplateSources {
            logrotate: Some(PathBuf::from("/srv/templates")),
            ..Default::default()
        };

        let files = vec![PathBuf::from("/opt/app1/logs/catalina.out")];
        let vars = LogrotateVars {
            files: &files,
            frequency: "daily",
            rotate: 7,
        };
        let out = Renderer::new(&fs, &sources)
            .render(Template::Logrotate, &vars)
            .unwrap();
        assert_eq!(out, "/opt/app1/logs/catalina.out daily/7");
    }

    #[test]
    fn missing_override_is_an_error() {
        let fs = MemoryFs::default();
        let sources = TemplateSources {
            init: Some(PathBuf::from("/srv/missing")),
            ..Default::default()
        };
        let vars = InitVars {
            tomcat_home: Path::new("/opt/app1"),
            tomcat_user: "tomcat",
            tomcat_name: "app1",
            kill_delay: 10,
        };

        assert!(Renderer::new(&fs, &sources).render(Template::Init, &vars).is_err());
    }

    #[test]
    fn jmx_templates_ignore_overrides() {
        let sources = TemplateSources {
            init: Some(PathBuf::from("/srv")),
            setenv: Some(PathBuf::from("/srv")),
            server_xml: Some(PathBuf::from("/srv")),
            logging_properties: Some(PathBuf::from("/srv")),
            logrotate: Some(PathBuf::from("/srv")),
        };
        assert!(Template::JmxAccess.override_dir(&sources).is_none());
        assert!(Template::JmxPassword.override_dir(&sources).is_none());
        assert!(Template::Init.override_dir(&sources).is_some());
    }
}

//! Resource graph of one Tomcat instance
//!
//! Builds the ordered plan for a pass. Every template is rendered here,
//! before anything on the host is touched, so a broken template or
//! override fails the run without side effects.

use anyhow::Result;
use declarative::ExecutionPlan;
use std::path::{Path, PathBuf};

use crate::config::InstanceConfig;
use crate::descriptors::DesiredState;
use crate::host::Host;
use crate::render::{
    InitVars, JmxPasswordVars, LogrotateVars, Renderer, ServerXmlVars, SetenvVars, Template,
};
use crate::resource::{
    Directory, Group, Install, Ownership, RemoteFile, Symlink, TemplateFile, User,
};

const ROOT: &str = "root";

pub fn build(config: &InstanceConfig, desired: &DesiredState, host: &Host) -> Result<ExecutionPlan> {
    let home = config.home.as_path();
    let service = desired.service_name.as_str();
    let user = config.user.as_str();
    let group = config.group.as_str();
    let renderer = Renderer::new(host.fs.as_ref(), &config.templates);

    let root_owned = |mode| Ownership::new(ROOT, ROOT, mode);
    let root_group = |mode| Ownership::new(ROOT, group, mode);
    let user_owned = |mode| Ownership::new(user, group, mode);
    let dir = |path: PathBuf, ownership| Directory::new(path, ownership, host.fs.clone());

    let mut plan = ExecutionPlan::new();

    plan.add(Box::new(Group::new(group, host.accounts.clone())));
    plan.add(Box::new(User::new(user, group, host.accounts.clone())));

    let tarball = config.tarball_path();
    plan.add(Box::new(RemoteFile::new(
        &config.download_url(),
        &tarball,
        &config.checksum,
        root_owned(0o644),
        host.fs.clone(),
        host.fetcher.clone(),
    )));

    plan.add(Box::new(dir(home.to_path_buf(), root_owned(0o755)).recursive()));
    plan.add(Box::new(Install::new(home, &tarball, group, host.fs.clone())));

    for sub in ["bin", "conf", "lib"] {
        plan.add(Box::new(dir(home.join(sub), root_group(0o755))));
    }
    plan.add(Box::new(dir(home.join("webapps"), root_group(0o775))));
    for sub in ["temp", "work"] {
        plan.add(Box::new(dir(home.join(sub), user_owned(0o755))));
    }
    plan.add(Box::new(dir(desired.log_dir.clone(), user_owned(0o755)).recursive()));

    if let Some(log_dir) = &config.log_dir {
        plan.add(Box::new(Symlink::new(log_dir, home.join("logs"), host.fs.clone())));
    }

    let file = |path: PathBuf, content: String, ownership| {
        TemplateFile::present(path, content, ownership, host.fs.clone()).notifies(service)
    };

    let init = renderer.render(
        Template::Init,
        &InitVars {
            tomcat_home: home,
            tomcat_user: user,
            tomcat_name: service,
            kill_delay: config.kill_delay,
        },
    )?;
    plan.add(Box::new(file(config.init_dir.join(service), init, root_owned(0o755))));

    let setenv = renderer.render(
        Template::Setenv,
        &SetenvVars {
            config,
            catalina_pid: PathBuf::from(format!("/var/run/{service}.pid")),
            jmx_port: config.jmx_port,
            jmx_authenticate: config.jmx_files_enabled(),
            jmx_access_file: jmx_access_path(home),
            jmx_password_file: jmx_password_path(home),
        },
    )?;
    plan.add(Box::new(file(home.join("bin/setenv.sh"), setenv, root_group(0o750))));

    let server_xml = renderer.render(
        Template::ServerXml,
        &ServerXmlVars {
            shutdown_port: config.shutdown_port,
            thread_pool: desired.thread_pool.as_ref(),
            http: desired.http.as_ref(),
            ssl: desired.ssl.as_ref(),
            ajp: desired.ajp.as_ref(),
            engine_valves: &desired.engine_valves,
            host_valves: &desired.host_valves,
            access_log_valve: desired.access_log_valve.as_ref(),
        },
    )?;
    plan.add(Box::new(file(home.join("conf/server.xml"), server_xml, root_group(0o640))));

    if config.jmx_files_enabled() {
        let access = renderer.render(Template::JmxAccess, &())?;
        let password = renderer.render(
            Template::JmxPassword,
            &JmxPasswordVars {
                control_password: config.jmx_control_password.as_deref(),
                monitor_password: config.jmx_monitor_password.as_deref(),
            },
        )?;
        plan.add(Box::new(file(jmx_access_path(home), access, user_owned(0o600))));
        plan.add(Box::new(file(jmx_password_path(home), password, user_owned(0o600))));
    } else {
        for path in [jmx_access_path(home), jmx_password_path(home)] {
            plan.add(Box::new(
                TemplateFile::absent(path, user_owned(0o600), host.fs.clone()).notifies(service),
            ));
        }
    }

    let logging = renderer.render(Template::LoggingProperties, &())?;
    plan.add(Box::new(file(
        home.join("conf/logging.properties"),
        logging,
        root_group(0o640),
    )));

    let logrotate = renderer.render(
        Template::Logrotate,
        &LogrotateVars {
            files: &desired.log_paths,
            frequency: &config.logrotate_frequency,
            rotate: config.logrotate_count,
        },
    )?;
    plan.add(Box::new(TemplateFile::present(
        config.logrotate_dir.join(service),
        logrotate,
        root_owned(0o644),
        host.fs.clone(),
    )));

    Ok(plan)
}

fn jmx_access_path(home: &Path) -> PathBuf {
    home.join("conf/jmxremote.access")
}

fn jmx_password_path(home: &Path) -> PathBuf {
    home.join("conf/jmxremote.password")
}

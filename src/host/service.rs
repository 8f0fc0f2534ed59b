//! Init-system service control

use anyhow::{Result, bail};
use declarative::{ServiceAction, ServiceStatus};
use std::fmt;
use std::fs;
use std::path::PathBuf;

use crate::runner;

/// Runlevels a SysV service is enabled in by default
const RUNLEVELS: [u8; 4] = [2, 3, 4, 5];

pub trait ServiceControl: Send + Sync + fmt::Debug {
    fn status(&self, name: &str) -> Result<ServiceStatus>;
    fn run(&self, name: &str, action: ServiceAction) -> Result<()>;
}

/// SysV init scripts, enabled with `update-rc.d` or `chkconfig`
#[derive(Debug, Clone)]
pub struct SysvInit {
    init_dir: PathBuf,
    rc_root: PathBuf,
}

impl SysvInit {
    pub fn new(init_dir: impl Into<PathBuf>) -> Self {
        Self {
            init_dir: init_dir.into(),
            rc_root: PathBuf::from("/etc"),
        }
    }

    fn script(&self, name: &str) -> PathBuf {
        self.init_dir.join(name)
    }

    /// A start link `S<nn><name>` exists in any default runlevel
    fn is_enabled(&self, name: &str) -> bool {
        RUNLEVELS.iter().any(|level| {
            let dir = self.rc_root.join(format!("rc{level}.d"));
            fs::read_dir(dir).is_ok_and(|entries| {
                entries.flatten().any(|entry| {
                    let file = entry.file_name();
                    let file = file.to_string_lossy();
                    file.strip_prefix('S').is_some_and(|rest| {
                        rest.trim_start_matches(|c: char| c.is_ascii_digit()) == name
                    })
                })
            })
        })
    }

    fn enable(&self, name: &str) -> Result<()> {
        if runner::command_exists("update-rc.d") {
            runner::run_capture("update-rc.d", &[name, "defaults"])?;
        } else if runner::command_exists("chkconfig") {
            runner::run_capture("chkconfig", &["--add", name])?;
            runner::run_capture("chkconfig", &[name, "on"])?;
        } else {
            bail!("Neither update-rc.d nor chkconfig is available to enable {name}");
        }
        Ok(())
    }
}

impl ServiceControl for SysvInit {
    fn status(&self, name: &str) -> Result<ServiceStatus> {
        let script = self.script(name);
        let running = script.is_file()
            && runner::run_quiet(&script.to_string_lossy(), &["status"]);

        Ok(ServiceStatus {
            enabled: self.is_enabled(name),
            running,
        })
    }

    fn run(&self, name: &str, action: ServiceAction) -> Result<()> {
        log::info!("{action} service {name}");
        match action {
            ServiceAction::Enable => self.enable(name),
            ServiceAction::Start | ServiceAction::Stop | ServiceAction::Restart => {
                let script = self.script(name);
                let verb = action.to_string();
                runner::run_capture(&script.to_string_lossy(), &[verb.as_str()])?;
                Ok(())
            }
        }
    }
}

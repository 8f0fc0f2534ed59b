use anyhow::{Context, Result};
use std::path::Path;
use std::process::{Command, Stdio};

/// Run a command and capture output, failing on a non-zero exit
pub fn run_capture(cmd: &str, args: &[&str]) -> Result<String> {
    log::debug!("exec: {} {}", cmd, args.join(" "));
    let output = Command::new(cmd)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .with_context(|| format!("Failed to execute: {} {}", cmd, args.join(" ")))?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("Command failed: {} {}: {}", cmd, args.join(" "), stderr.trim())
    }
}

/// Run a command silently, returning success/failure
pub fn run_quiet(cmd: &str, args: &[&str]) -> bool {
    Command::new(cmd)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Check if a command exists on PATH
pub fn command_exists(cmd: &str) -> bool {
    std::env::var_os("PATH").is_some_and(|paths| {
        std::env::split_paths(&paths).any(|dir| Path::new(&dir).join(cmd).is_file())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_trims_output() {
        assert_eq!(run_capture("echo", &["  hello  "]).unwrap(), "hello");
    }

    #[test]
    fn capture_reports_failure() {
        let err = run_capture("sh", &["-c", "echo boom >&2; exit 3"]).unwrap_err();
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn quiet_reports_status() {
        assert!(run_quiet("true", &[]));
        assert!(!run_quiet("false", &[]));
        assert!(!run_quiet("definitely-not-a-command-tomcat-bin", &[]));
    }

    #[test]
    fn finds_shell_on_path() {
        assert!(command_exists("sh"));
        assert!(!command_exists("definitely-not-a-command-tomcat-bin"));
    }
}

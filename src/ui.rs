use colored::Colorize;
use declarative::{ApplyResult, ProgressCallback, ResourceDiff, ResourceState, SignalCause};

use crate::provision::Report;

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a section header
pub fn section(title: &str) {
    println!();
    println!("{}", title.cyan().bold());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

/// One line per resource as the pass walks the plan
///
/// Unchanged resources are only listed with `--verbose`.
pub struct Reporter {
    verbose: bool,
    quiet: bool,
    current: Option<String>,
}

impl Reporter {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            verbose,
            quiet,
            current: None,
        }
    }
}

impl ProgressCallback for Reporter {
    fn on_batch_start(&mut self, count: usize) {
        if !self.quiet {
            dim(&format!("{count} resources"));
        }
    }

    fn on_resource_start(&mut self, _id: &str, description: &str) {
        self.current = Some(description.to_string());
    }

    fn on_resource_complete(&mut self, id: &str, result: &ApplyResult) {
        let description = self.current.take().unwrap_or_else(|| id.to_string());
        if self.quiet {
            return;
        }
        match result {
            ApplyResult::Created => println!("  {} {}", "+".green(), description),
            ApplyResult::Modified => println!("  {} {}", "~".yellow(), description),
            ApplyResult::Removed => println!("  {} {}", "-".red(), description),
            ApplyResult::Skipped { reason } => {
                println!("  {} {} {}", "○".dimmed(), description, format!("({reason})").dimmed())
            }
            ApplyResult::NoChange if self.verbose => {
                println!("  {} {}", "✓".green(), description.dimmed())
            }
            ApplyResult::NoChange => {}
        }
    }

    fn on_batch_complete(&mut self) {}
}

/// Print the outcome of a `create` pass
pub fn print_summary(report: &Report, dry_run: bool) {
    let summary = &report.summary;

    section("Summary");
    kv("Created", &summary.created.to_string());
    kv("Modified", &summary.modified.to_string());
    kv("Removed", &summary.removed.to_string());
    if summary.skipped > 0 {
        kv("Skipped", &summary.skipped.to_string().yellow().to_string());
    }
    kv("Unchanged", &summary.no_change.to_string());

    if !report.restart_requests.is_empty() {
        section("Restart requests");
        for request in &report.restart_requests {
            let cause = match request.cause {
                SignalCause::FirstWrite => "first write",
                SignalCause::Changed => "changed",
            };
            println!("  {} {} {}", "↻".cyan(), request.source, format!("({cause})").dimmed());
        }
    }

    match &report.service {
        Some(service) if service.actions.is_empty() => {
            println!();
            success(&format!("Service {} already enabled and running", service.name));
        }
        Some(service) => {
            let verb = if dry_run { "Would run" } else { "Ran" };
            let actions: Vec<String> = service.actions.iter().map(|a| a.to_string()).collect();
            println!();
            info(&format!("{verb} on {}: {}", service.name, actions.join(", ")));
        }
        None => {
            println!();
            warn("start_service is off; service left untouched");
        }
    }

    println!();
    if dry_run {
        warn(&format!(
            "Dry run: {} change(s) would be made",
            summary.total_changes()
        ));
    } else if summary.total_changes() == 0 {
        success("Already converged");
    } else {
        success(&format!("Applied {} change(s)", summary.total_changes()));
    }
}

/// Display the differences found by a probe-only pass
pub fn display_diff(diffs: &[ResourceDiff]) {
    if diffs.is_empty() {
        println!();
        println!("  {} No changes needed", "✓".green());
        return;
    }

    println!();
    for diff in diffs {
        let symbol = if diff.is_addition() {
            "+".green()
        } else if diff.is_removal() {
            "-".red()
        } else {
            "~".yellow()
        };

        let state_desc = match (&diff.current, &diff.desired) {
            (ResourceState::Absent, ResourceState::Present { details }) => details
                .as_ref()
                .map(|d| format!("(missing) → {d}"))
                .unwrap_or_else(|| "(missing)".to_string()),
            (ResourceState::Modified { from, to }, _) => format!("{from} → {to}"),
            (_, ResourceState::Absent) => "(will remove)".to_string(),
            _ => String::new(),
        };

        println!(
            "  {} {:<12} {:<40} {}",
            symbol,
            diff.resource_type,
            diff.resource_id,
            state_desc.dimmed()
        );
    }

    println!();
    println!(
        "  Summary: {} change(s) pending",
        diffs.len().to_string().bold()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reporter_consumes_current_description() {
        let mut reporter = Reporter::new(false, true);
        reporter.on_resource_start("/opt/app1", "Directory /opt/app1");
        assert_eq!(reporter.current.as_deref(), Some("Directory /opt/app1"));

        reporter.on_resource_complete("/opt/app1", &ApplyResult::Created);
        assert!(reporter.current.is_none());
    }
}

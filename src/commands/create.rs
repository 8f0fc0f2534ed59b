//! `create` - one convergence pass over an instance

use anyhow::{Context as AnyhowContext, Result};
use declarative::{ConvergeError, ExecuteOptions};

use crate::Context;
use crate::cli::CreateArgs;
use crate::config::InstanceConfig;
use crate::host::{FetchError, Host};
use crate::provision;
use crate::ui;

pub fn run(ctx: &Context, args: CreateArgs) -> Result<()> {
    let config = InstanceConfig::load(&args.config.config)?;
    let host = Host::local(&config.init_dir);

    if !ctx.quiet {
        ui::header(&format!("Tomcat {} at {}", config.version, config.home.display()));
        if args.dry_run {
            ui::warn("Dry run - no changes will be made");
        }
    }

    let opts = ExecuteOptions {
        dry_run: args.dry_run,
        verbose: ctx.verbose > 0,
    };
    let mut reporter = ui::Reporter::new(ctx.verbose > 0, ctx.quiet);

    let report = match provision::create(&config, &host, &opts, &mut reporter) {
        Ok(report) => report,
        Err(err) => {
            explain(&err);
            return Err(err).context("create failed");
        }
    };

    if !ctx.quiet {
        ui::print_summary(&report, args.dry_run);
    }
    Ok(())
}

/// Point the operator at the likely fix for a failed download
fn explain(err: &anyhow::Error) {
    let Some(converge) = err.downcast_ref::<ConvergeError>() else {
        return;
    };
    if converge.applied > 0 {
        ui::warn(&format!(
            "{} change(s) were applied before the failure; rerun once fixed",
            converge.applied
        ));
    }
    if let Some(fetch) = converge.cause.downcast_ref::<FetchError>() {
        let category = fetch.category();
        ui::error(&format!("{category}: {}", category.advice()));
    }
}

//! `diff` - preview what `create` would change

use anyhow::Result;

use crate::Context;
use crate::cli::ConfigArg;
use crate::config::InstanceConfig;
use crate::host::Host;
use crate::provision;
use crate::ui;

pub fn run(ctx: &Context, args: ConfigArg) -> Result<()> {
    let config = InstanceConfig::load(&args.config)?;
    let host = Host::local(&config.init_dir);

    let diffs = provision::diff(&config, &host)?;
    log::debug!("{} resource(s) differ", diffs.len());

    if !ctx.quiet {
        ui::header(&format!("Tomcat {} at {}", config.version, config.home.display()));
    }
    ui::display_diff(&diffs);
    Ok(())
}

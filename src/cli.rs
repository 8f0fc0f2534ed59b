use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "tomcat-bin")]
#[command(version)]
#[command(about = "Provision and converge Apache Tomcat instances", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Converge the host to the configured instance
    Create(CreateArgs),

    /// Show what `create` would change, without touching the host
    Diff(ConfigArg),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct ConfigArg {
    /// Instance configuration (TOML, or JSON with a .json extension)
    #[arg(short, long, value_name = "FILE")]
    pub config: PathBuf,
}

#[derive(Args)]
pub struct CreateArgs {
    #[command(flatten)]
    pub config: ConfigArg,

    /// Report what would change without making changes
    #[arg(long)]
    pub dry_run: bool,
}

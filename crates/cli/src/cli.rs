use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// hotpatch - drive a resource hot-update pipeline
#[derive(Debug, Parser)]
#[command(name = "hotpatch")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Project root containing the `.hotpatch/` directory.
    #[arg(long, global = true, default_value = ".")]
    pub root: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create a `.hotpatch/` directory from the built-in templates
    Init {
        /// Overwrite an existing `.hotpatch/` directory
        #[arg(long)]
        force: bool,

        /// Only create the default package
        #[arg(long)]
        minimal: bool,
    },

    /// List configured packages
    List {
        /// Print the loaded configuration as JSON
        #[arg(long)]
        json: bool,
    },

    /// Patch a package against its simulated remote
    Run(RunArgs),
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Name of the package to patch
    pub package: String,

    /// Confirm downloads and download retries without asking
    #[arg(long, short = 'y')]
    pub yes: bool,

    /// Print every pipeline event as a JSON line
    #[arg(long)]
    pub json: bool,

    /// How often a failed download is started over before giving up
    #[arg(long, default_value_t = 2)]
    pub download_retries: u32,

    /// Simulate this many failed initialize calls
    #[arg(long, default_value_t = 0)]
    pub fail_init: u32,

    /// Simulate this many failed version requests
    #[arg(long, default_value_t = 0)]
    pub fail_version: u32,

    /// Simulate this many failed manifest updates
    #[arg(long, default_value_t = 0)]
    pub fail_manifest: u32,

    /// Simulated latency of every provider call, in milliseconds
    #[arg(long, default_value_t = 50)]
    pub delay_ms: u64,

    /// Interval between two host ticks, in milliseconds
    #[arg(long, default_value_t = 16)]
    pub tick_ms: u64,
}

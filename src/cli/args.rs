use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Decides which remote modules must be rebuilt and which can be reused.
#[derive(Debug, Parser)]
#[command(version)]
pub struct CliArgs {
    #[command(subcommand)]
    pub cmd: Command,
    /// Project root directory
    #[arg(short, long, env = "MODCACHE_ROOT")]
    pub root: Option<PathBuf>,
    #[arg(short, long, default_value = "modcache.lock")]
    pub lock_file: PathBuf,
    #[arg(short, long, default_value = "project.toml")]
    pub project_file: PathBuf,
    /// Directory holding the checksum snapshot, relative to the root
    #[arg(short, long)]
    pub cache_directory: Option<PathBuf>,
    /// Print more information
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Resolves the modules to rebuild and adds an aggregate target for them to the project
    Plan {
        /// Ignore the checksum snapshot and rebuild every remote module
        #[arg(long)]
        rebuild: bool,
        /// Name of the synthesized aggregate target
        #[arg(short, long)]
        target: Option<String>,
        /// Regular expression with a `family` group used to classify module names
        #[arg(long)]
        family_pattern: Option<String>,
        /// Only report, without writing the project or the checksum snapshot
        #[arg(long)]
        dry_run: bool,
        /// Write the resolution as TOML to this file
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Deletes the checksum snapshot so the next plan rebuilds every remote module
    ClearCache,
}

use std::error::Error;

use clap::Parser;
use modcache::{
    cli::args::{CliArgs, Command},
    Modcache, PlanOptions, RebuildMode,
};

fn main() {
    let cli_args: CliArgs = CliArgs::parse();
    let default_filter = if cli_args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    if let Err(e) = run(cli_args) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(cli_args: CliArgs) -> Result<(), Box<dyn Error>> {
    let mut builder = Modcache::builder()
        .lock_file_name(&cli_args.lock_file)
        .project_file_name(&cli_args.project_file);
    if let Some(root) = &cli_args.root {
        builder = builder.root(root);
    }
    if let Some(cache_directory) = &cli_args.cache_directory {
        builder = builder.cache_directory(cache_directory);
    }

    match cli_args.cmd {
        Command::Plan {
            rebuild,
            target,
            family_pattern,
            dry_run,
            report,
        } => {
            if let Some(target) = target {
                builder = builder.build_target(target);
            }
            if let Some(family_pattern) = family_pattern {
                builder = builder.family_pattern(family_pattern);
            }
            let modcache = builder.try_build()?;
            let mode = if rebuild {
                RebuildMode::Full
            } else {
                RebuildMode::Changed
            };
            modcache.plan_and_report(PlanOptions { mode, dry_run }, report.as_deref())?;
            Ok(())
        }
        Command::ClearCache => builder.try_build()?.clear_cache(),
    }
}

use std::process::ExitCode;

use anyhow::Result;

use super::env::CliArgs;
use super::profiles::cmd_profiles;
use super::run::cmd_run;
use super::snapshot::cmd_snapshot;
use crate::cli::commands::Commands;
use crate::config::Config;

pub async fn dispatch(cli: &CliArgs, config: &Config) -> Result<ExitCode> {
    match cli.command.clone() {
        Commands::Run(args) => cmd_run(args, config).await,
        Commands::Snapshot(args) => cmd_snapshot(args, config).await,
        Commands::Profiles(args) => cmd_profiles(args),
    }
}

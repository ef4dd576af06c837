use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use super::dispatch::dispatch;
use super::env::CliArgs;
use super::runtime::{init_logging, load_config, load_local_env_overrides, LoadedConfig};

pub async fn run() -> Result<ExitCode> {
    let local_env = load_local_env_overrides();
    let cli = CliArgs::parse();

    init_logging(&cli.log_level, cli.debug, cli.log_format)?;
    info!("Starting relist v{}", env!("CARGO_PKG_VERSION"));
    if let Some(path) = local_env {
        info!(path = %path.display(), "Loaded environment overrides");
    }

    let LoadedConfig { config, path } = load_config(cli.config.as_deref()).await?;
    if let Some(path) = &path {
        info!(path = %path.display(), "Using configuration");
    }

    match dispatch(&cli, &config).await {
        Ok(code) => {
            info!(?code, "Command finished");
            Ok(code)
        }
        Err(err) => {
            error!("Command failed: {:#}", err);
            Err(err)
        }
    }
}

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::warn;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use super::env::LogFormat;
use crate::config::Config;

pub const LOCAL_ENV_PATH: &str = "config/local.env";

/// Load `config/local.env` into the process environment. Variables that are already set keep
/// their values. Returns the path when a file was loaded.
pub fn load_local_env_overrides() -> Option<PathBuf> {
    let path = Path::new(LOCAL_ENV_PATH);
    if !path.exists() {
        return None;
    }
    match dotenvy::from_path(path) {
        Ok(()) => Some(path.to_path_buf()),
        Err(err) => {
            // Logging is not up yet.
            eprintln!("warning: failed to read {}: {err}", path.display());
            None
        }
    }
}

pub fn init_logging(level: &str, debug: bool, format: LogFormat) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match format {
        LogFormat::Human => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
    };
    installed.context("Failed to install the log subscriber")?;

    Ok(())
}

pub struct LoadedConfig {
    pub config: Config,
    /// The file the configuration came from, if one was found.
    pub path: Option<PathBuf>,
}

pub async fn load_config(config_path: Option<&Path>) -> Result<LoadedConfig> {
    let Some(path) = Config::locate(config_path) else {
        warn!("No config directory available, using defaults");
        return Ok(LoadedConfig {
            config: Config::default(),
            path: None,
        });
    };

    if !path.exists() {
        warn!("Config file not found, using defaults: {}", path.display());
        return Ok(LoadedConfig {
            config: Config::default(),
            path: None,
        });
    }

    let config = Config::load(&path)
        .await
        .context("Failed to load config file")?;
    Ok(LoadedConfig {
        config,
        path: Some(path),
    })
}

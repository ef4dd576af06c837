//! Configuration file model
//!
//! One YAML document with a section per layer. Every section is optional and falls back to
//! its defaults, so an empty or missing file is a valid configuration.

use std::path::{Path, PathBuf};

use action_primitives::Pacing;
use agent_core::{AgentLoopConfig, PlannerConfig};
use cdp_adapter::CdpConfig;
use perceiver_structural::SnapshotLimits;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Project-local configuration file, checked before the user config directory.
pub const LOCAL_CONFIG_PATH: &str = "config/config.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub browser: CdpConfig,
    pub planner: PlannerConfig,
    pub agent: AgentLoopConfig,
    pub pacing: Pacing,
    pub snapshot: SnapshotLimits,
    pub notifications: NotificationConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Run events are POSTed here when set.
    pub webhook_url: Option<String>,
}

impl NotificationConfig {
    pub fn webhook_url(&self) -> Option<&str> {
        self.webhook_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

impl Config {
    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }

    /// Read and parse `path`. A missing file is not handled here; see [`Config::locate`].
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_yaml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Where to look for the configuration file.
    ///
    /// Priority: explicit path > ./config/config.yaml > <config_dir>/relist/config.yaml
    pub fn locate(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        let local = PathBuf::from(LOCAL_CONFIG_PATH);
        if local.exists() {
            return Some(local);
        }
        dirs::config_dir().map(|mut path| {
            path.push("relist");
            path.push("config.yaml");
            path
        })
    }
}

use std::{env, time::Duration};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{PlanRequest, PlanResponse, Planner, PlannerError};
use crate::errors::AgentError;

/// Environment variable consulted when no API key is configured.
pub const PLANNER_KEY_ENV: &str = "RELIST_PLANNER_KEY";

/// Where and how to reach the planning service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Full URL of the plan endpoint.
    pub endpoint: String,
    /// Bearer token. Falls back to `RELIST_PLANNER_KEY`.
    pub api_key: Option<String>,
    /// Per-request budget in milliseconds.
    /// Default: 30000
    pub timeout_ms: u64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8787/api/agent/plan".to_string(),
            api_key: None,
            timeout_ms: 30_000,
        }
    }
}

impl PlannerConfig {
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| env::var(PLANNER_KEY_ENV).ok())
            .filter(|key| !key.trim().is_empty())
    }
}

/// [`Planner`] backed by the remote planning service over HTTP.
pub struct HttpPlanner {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpPlanner {
    pub fn new(config: &PlannerConfig) -> Result<Self, AgentError> {
        if config.endpoint.trim().is_empty() {
            return Err(AgentError::config("planner endpoint is empty"));
        }
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|err| AgentError::config(format!("failed to build HTTP client: {err}")))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.resolved_api_key(),
        })
    }
}

#[async_trait]
impl Planner for HttpPlanner {
    async fn plan(&self, request: &PlanRequest) -> Result<PlanResponse, PlannerError> {
        let mut builder = self.client.post(&self.endpoint).json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|err| PlannerError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<response unavailable>".to_string());
            warn!(target: "planner", status = status.as_u16(), "plan request failed");
            return Err(PlannerError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|err| PlannerError::Transport(err.to_string()))?;
        let plan: PlanResponse =
            serde_json::from_str(&body).map_err(|err| PlannerError::Decode(err.to_string()))?;

        if !plan.success {
            let reason = plan
                .error
                .clone()
                .unwrap_or_else(|| "success was false".to_string());
            return Err(PlannerError::Rejected(reason));
        }

        debug!(
            target: "planner",
            actions = plan.actions.as_ref().map(Vec::len).unwrap_or(0),
            "plan received"
        );
        Ok(plan)
    }
}

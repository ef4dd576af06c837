mod http;

use action_primitives::Action;
use async_trait::async_trait;
use perceiver_structural::PageSnapshot;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{agent_loop::ActionRecord, payload::ListingPayload};

pub use http::{HttpPlanner, PlannerConfig};

/// What the loop sends each planning round.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanRequest {
    pub page_context: PageSnapshot,
    pub listing_data: ListingPayload,
    /// Coarse phase: `filling` or `submit`.
    pub current_step: String,
    /// Most recent executed actions, oldest first.
    pub previous_actions: Vec<ActionRecord>,
    pub marketplace: String,
}

/// Planner reply. Absent or empty `actions` on success means "no plan this round".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<Action>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PlanResponse {
    pub fn with_actions(actions: Vec<Action>) -> Self {
        Self {
            success: true,
            actions: Some(actions),
            error: None,
        }
    }

    /// Planned actions, empty when the planner had nothing to offer.
    pub fn into_actions(self) -> Vec<Action> {
        self.actions.unwrap_or_default()
    }
}

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("planner returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("planner rejected the request: {0}")]
    Rejected(String),

    #[error("planner unreachable: {0}")]
    Transport(String),

    #[error("planner response undecodable: {0}")]
    Decode(String),
}

impl PlannerError {
    pub fn is_retryable(&self) -> bool {
        match self {
            PlannerError::Status { status, .. } => *status == 429 || *status >= 500,
            PlannerError::Transport(_) => true,
            PlannerError::Rejected(_) | PlannerError::Decode(_) => false,
        }
    }
}

/// The remote decision maker the loop consults every planning round.
#[async_trait]
pub trait Planner: Send + Sync {
    async fn plan(&self, request: &PlanRequest) -> Result<PlanResponse, PlannerError>;
}

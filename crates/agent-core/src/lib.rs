//! Listing agent core.
//!
//! Drives a marketplace's own create-listing form: observe the page, ask the remote planner
//! what to do, execute its actions, and recover when the page stops changing.

pub mod agent_loop;
pub mod errors;
pub mod marketplace;
pub mod notify;
pub mod payload;
pub mod planner;

pub use agent_loop::{
    ActionRecord, AgentLoopConfig, AgentState, ListingAgent, ListingAgentBuilder, Phase,
    RunOutcome, RunStatus,
};
pub use errors::AgentError;
pub use marketplace::{FieldSelectors, MarketplaceProfile, ProfileSummary};
pub use notify::{FanoutNotifier, LogNotifier, RunEvent, RunEventKind, RunNotifier, WebhookNotifier};
pub use payload::ListingPayload;
pub use planner::{HttpPlanner, PlanRequest, PlanResponse, Planner, PlannerConfig, PlannerError};

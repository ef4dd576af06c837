//! Configuration for the listing loop.

use serde::{Deserialize, Serialize};

/// Bounds and delays of one listing run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentLoopConfig {
    /// Hard cap on loop iterations; the run always terminates.
    /// Default: 50
    pub max_iterations: u32,

    /// Consecutive identical fingerprints that trigger a recovery pass.
    /// Default: 3
    pub stuck_threshold: u32,

    /// Consecutive failed planning rounds before the direct-fill fallback.
    /// Default: 3
    pub max_failed_iterations: u32,

    /// How many recent actions are sent to the planner.
    /// Default: 10
    pub previous_actions_window: usize,

    /// Delay before each capture, letting the page react to the last action.
    /// Default: 1500
    pub page_settle_ms: u64,

    /// Back-off after a failed planning round.
    /// Default: 2000
    pub planner_retry_delay_ms: u64,

    /// Upper bound on crop dialogs closed after the initial upload.
    /// Default: 5
    pub max_crop_dialogs: usize,

    /// Size picked by recovery when the listing has none.
    /// Default: "M"
    pub default_size: String,
}

impl Default for AgentLoopConfig {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            stuck_threshold: 3,
            max_failed_iterations: 3,
            previous_actions_window: 10,
            page_settle_ms: 1_500,
            planner_retry_delay_ms: 2_000,
            max_crop_dialogs: 5,
            default_size: "M".to_string(),
        }
    }
}

impl AgentLoopConfig {
    /// Same bounds, no delays. Used by tests.
    pub fn instant() -> Self {
        Self {
            page_settle_ms: 0,
            planner_retry_delay_ms: 0,
            ..Self::default()
        }
    }
}

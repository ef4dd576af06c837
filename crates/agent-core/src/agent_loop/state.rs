//! Mutable state of one listing run.

use action_primitives::{Action, ExecutionOutcome};
use perceiver_structural::PageSnapshot;
use serde::{Deserialize, Serialize};

/// Named states of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Injecting the listing images before the first planning round.
    Uploading,
    Looping,
    Succeeded,
    Failed,
    /// The iteration cap was reached.
    Exhausted,
}

/// Coarse form phase reported to the planner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurrentStep {
    #[default]
    Filling,
    Submit,
}

impl CurrentStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            CurrentStep::Filling => "filling",
            CurrentStep::Submit => "submit",
        }
    }
}

/// One executed action as the planner sees it in `previousActions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRecord {
    #[serde(flatten)]
    pub action: Action,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub iteration: u32,
}

impl ActionRecord {
    pub fn new(action: Action, outcome: &ExecutionOutcome, iteration: u32) -> Self {
        let error = match outcome {
            ExecutionOutcome::Failed { reason } => Some(reason.clone()),
            ExecutionOutcome::Error { description } => Some(description.clone()),
            ExecutionOutcome::Succeeded | ExecutionOutcome::Done => None,
        };
        Self {
            action,
            success: outcome.is_success(),
            error,
            iteration,
        }
    }
}

/// Cheap structural summary used to detect a page that is not moving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    errors: Vec<String>,
    url: String,
    modal_count: usize,
}

impl Fingerprint {
    pub fn of(snapshot: &PageSnapshot) -> Self {
        Self {
            errors: snapshot.errors.clone(),
            url: snapshot.url.clone(),
            modal_count: snapshot.modals.len(),
        }
    }
}

/// Owned by the loop for the duration of one run.
#[derive(Debug, Clone)]
pub struct AgentState {
    pub phase: Phase,
    pub iteration: u32,
    pub previous_actions: Vec<ActionRecord>,
    pub current_step: CurrentStep,
    /// Consecutive planning rounds that produced nothing to execute.
    pub failed_iterations: u32,
    /// Consecutive repeats of the last fingerprint.
    pub stuck_count: u32,
    last_fingerprint: Option<Fingerprint>,
}

impl Default for AgentState {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentState {
    pub fn new() -> Self {
        Self {
            phase: Phase::Looping,
            iteration: 0,
            previous_actions: Vec::new(),
            current_step: CurrentStep::Filling,
            failed_iterations: 0,
            stuck_count: 0,
            last_fingerprint: None,
        }
    }

    /// Feed the fingerprint of a fresh capture. Returns true exactly when the repeat count
    /// reaches `threshold`; the counter then starts over.
    pub fn observe(&mut self, fingerprint: Fingerprint, threshold: u32) -> bool {
        if self.last_fingerprint.as_ref() == Some(&fingerprint) {
            self.stuck_count += 1;
            if self.stuck_count >= threshold {
                self.stuck_count = 0;
                return true;
            }
            return false;
        }
        self.stuck_count = 0;
        self.last_fingerprint = Some(fingerprint);
        false
    }

    /// Count a failed planning round; returns true when the direct-fill threshold is hit,
    /// resetting the counter.
    pub fn planning_failed(&mut self, threshold: u32) -> bool {
        self.failed_iterations += 1;
        if self.failed_iterations >= threshold {
            self.failed_iterations = 0;
            return true;
        }
        false
    }

    pub fn planning_succeeded(&mut self) {
        self.failed_iterations = 0;
    }

    pub fn record(&mut self, action: Action, outcome: &ExecutionOutcome) {
        self.previous_actions
            .push(ActionRecord::new(action, outcome, self.iteration));
    }

    /// The last `window` records, oldest first.
    pub fn recent_actions(&self, window: usize) -> Vec<ActionRecord> {
        let start = self.previous_actions.len().saturating_sub(window);
        self.previous_actions[start..].to_vec()
    }

    /// Switch to `submit` once a recent action talks about moving on. Never switches back.
    pub fn update_step(&mut self, window: usize) {
        if self.current_step == CurrentStep::Submit {
            return;
        }
        let start = self.previous_actions.len().saturating_sub(window);
        let moving_on = self.previous_actions[start..].iter().any(|record| {
            record
                .action
                .description()
                .map(mentions_submission)
                .unwrap_or(false)
        });
        if moving_on {
            self.current_step = CurrentStep::Submit;
        }
    }
}

fn mentions_submission(description: &str) -> bool {
    description
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| matches!(word, "next" | "submit" | "list"))
}

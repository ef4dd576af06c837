//! Listing loop controller.
//!
//! One run drives the marketplace's create form until the listing is published or the
//! iteration cap is reached. Every fallible step is contained: locator misses, action
//! failures, capture failures, and planner failures all feed counters instead of ending the
//! run.

use std::sync::Arc;

use action_locator::ElementLocator;
use action_primitives::{
    pacing::pause, Action, ActionExecutor, ExecutionOutcome, ExecutorOptions, HttpImageFetcher,
    ImageFetcher, Pacing,
};
use cdp_adapter::DomPort;
use chrono::Utc;
use perceiver_structural::{PageSnapshot, SnapshotLimits, StructuralPerceiver};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span, warn, Instrument};

use super::{
    config::AgentLoopConfig,
    state::{AgentState, Fingerprint, Phase},
};
use crate::{
    errors::AgentError,
    marketplace::MarketplaceProfile,
    notify::{LogNotifier, RunEvent, RunEventKind, RunNotifier},
    payload::ListingPayload,
    planner::{PlanRequest, Planner},
};

/// Terminal status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Succeeded,
    /// The listing was rejected before the run started.
    Failed,
    /// The iteration cap was reached without a published listing.
    Exhausted,
}

/// Completion report handed back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub status: RunStatus,
    pub iterations: u32,
}

impl RunOutcome {
    pub fn succeeded(url: Option<String>, iterations: u32) -> Self {
        Self {
            success: true,
            url,
            error: None,
            status: RunStatus::Succeeded,
            iterations,
        }
    }

    pub fn failed(error: impl Into<String>, iterations: u32) -> Self {
        Self {
            success: false,
            url: None,
            error: Some(error.into()),
            status: RunStatus::Failed,
            iterations,
        }
    }

    pub fn exhausted(iterations: u32) -> Self {
        Self {
            success: false,
            url: None,
            error: Some(format!("no published listing after {iterations} iterations")),
            status: RunStatus::Exhausted,
            iterations,
        }
    }
}

/// What one loop iteration decided.
enum Step {
    Continue,
    Finished(RunOutcome),
}

/// Builder for [`ListingAgent`].
pub struct ListingAgentBuilder {
    dom: Arc<dyn DomPort>,
    planner: Arc<dyn Planner>,
    profile: MarketplaceProfile,
    config: AgentLoopConfig,
    pacing: Pacing,
    limits: SnapshotLimits,
    fetcher: Option<Arc<dyn ImageFetcher>>,
    notifier: Arc<dyn RunNotifier>,
}

impl ListingAgentBuilder {
    pub fn config(mut self, config: AgentLoopConfig) -> Self {
        self.config = config;
        self
    }

    pub fn pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn snapshot_limits(mut self, limits: SnapshotLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn fetcher(mut self, fetcher: Arc<dyn ImageFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn RunNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn build(self) -> Result<ListingAgent, AgentError> {
        let fetcher: Arc<dyn ImageFetcher> = match self.fetcher {
            Some(fetcher) => fetcher,
            None => Arc::new(
                HttpImageFetcher::new(self.pacing.image_fetch_timeout())
                    .map_err(|err| AgentError::config(err.to_string()))?,
            ),
        };
        let locator = ElementLocator::new(self.dom);
        let options = ExecutorOptions {
            max_images: self.profile.max_images,
            price_markers: self.profile.price_markers.clone(),
        };
        Ok(ListingAgent {
            perceiver: StructuralPerceiver::new(locator.clone(), self.limits),
            executor: ActionExecutor::new(locator, fetcher, self.pacing, options),
            planner: self.planner,
            profile: self.profile,
            config: self.config,
            notifier: self.notifier,
        })
    }
}

/// The orchestrator: observe, plan, act, recover.
pub struct ListingAgent {
    pub(super) executor: ActionExecutor,
    pub(super) perceiver: StructuralPerceiver,
    pub(super) planner: Arc<dyn Planner>,
    pub(super) profile: MarketplaceProfile,
    pub(super) config: AgentLoopConfig,
    notifier: Arc<dyn RunNotifier>,
}

impl ListingAgent {
    pub fn builder(
        dom: Arc<dyn DomPort>,
        planner: Arc<dyn Planner>,
        profile: MarketplaceProfile,
    ) -> ListingAgentBuilder {
        ListingAgentBuilder {
            dom,
            planner,
            profile,
            config: AgentLoopConfig::default(),
            pacing: Pacing::default(),
            limits: SnapshotLimits::default(),
            fetcher: None,
            notifier: Arc::new(LogNotifier),
        }
    }

    /// Run one listing attempt to completion. Never returns an error: every ending,
    /// including a rejected payload, is a [`RunOutcome`].
    pub async fn run(&self, listing: &ListingPayload) -> RunOutcome {
        let span = info_span!("listing_run", marketplace = %self.profile.name);
        let outcome = self.run_inner(listing).instrument(span).await;
        self.notify(listing, &outcome).await;
        outcome
    }

    /// Steps:
    /// 1. Validate and normalize the listing for this marketplace
    /// 2. Upload images, closing the crop dialogs that follow
    /// 3. Loop until success or the iteration cap
    /// 4. On exhaustion, try a final submit and report the failure
    async fn run_inner(&self, listing: &ListingPayload) -> RunOutcome {
        if let Err(err) = listing.validate() {
            warn!(%err, "listing rejected before the run started");
            return RunOutcome::failed(err.to_string(), 0);
        }
        let prepared = self.profile.prepare(listing);
        let mut state = AgentState::new();

        if prepared.has_images() {
            state.phase = Phase::Uploading;
            self.upload_images(&mut state, &prepared).await;
        }

        state.phase = Phase::Looping;
        info!(max_iterations = self.config.max_iterations, "entering listing loop");

        while state.iteration < self.config.max_iterations {
            state.iteration += 1;
            let span = info_span!("iteration", iteration = state.iteration);
            match self.iterate(&mut state, &prepared).instrument(span).await {
                Step::Continue => {}
                Step::Finished(outcome) => {
                    state.phase = if outcome.success {
                        Phase::Succeeded
                    } else {
                        Phase::Failed
                    };
                    info!(phase = ?state.phase, iterations = state.iteration, "run finished");
                    return outcome;
                }
            }
        }

        state.phase = Phase::Exhausted;
        warn!(iterations = state.iteration, "iteration cap reached");
        self.final_submit().await;
        RunOutcome::exhausted(state.iteration)
    }

    async fn upload_images(&self, state: &mut AgentState, listing: &ListingPayload) {
        let mut selector = None;
        for candidate in &self.profile.fields.file_input {
            if self.executor.locator().resolve(candidate).await.is_some() {
                selector = Some(candidate.clone());
                break;
            }
        }

        let action =
            Action::upload(selector, &listing.images).with_description("upload listing images");
        let outcome = self.executor.execute(&action).await;
        if !outcome.is_success() {
            warn!(?outcome, "image upload failed; continuing without it");
        }
        state.record(action, &outcome);

        let closed = self
            .executor
            .overlays()
            .dismiss_repeatedly(self.config.max_crop_dialogs)
            .await;
        debug!(closed, "crop dialogs handled after upload");
    }

    /// One pass of the loop body.
    async fn iterate(&self, state: &mut AgentState, listing: &ListingPayload) -> Step {
        if self.executor.overlays().dismiss_any().await {
            debug!("overlay dismissed; re-observing");
            return Step::Continue;
        }

        pause(self.config.page_settle_ms).await;
        let snapshot = match self.perceiver.capture().await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(%err, "page capture failed");
                self.planning_failed(state, listing, None).await;
                return Step::Continue;
            }
        };

        let stuck = state.observe(Fingerprint::of(&snapshot), self.config.stuck_threshold);

        if let Some(url) = self.check_success(&snapshot).await {
            return Step::Finished(RunOutcome::succeeded(Some(url), state.iteration));
        }

        if stuck {
            info!(errors = ?snapshot.errors, "page is not changing; running recovery");
            self.recover(state, listing, &snapshot).await;
            return Step::Continue;
        }

        let request = PlanRequest {
            page_context: snapshot.clone(),
            listing_data: listing.clone(),
            current_step: state.current_step.as_str().to_string(),
            previous_actions: state.recent_actions(self.config.previous_actions_window),
            marketplace: self.profile.name.clone(),
        };

        let actions = match self.planner.plan(&request).await {
            Ok(plan) => plan.into_actions(),
            Err(err) => {
                warn!(%err, retryable = err.is_retryable(), "planning round failed");
                self.planning_failed(state, listing, Some(&snapshot)).await;
                return Step::Continue;
            }
        };

        if actions.is_empty() {
            info!("planner returned no actions");
            self.planning_failed(state, listing, Some(&snapshot)).await;
            return Step::Continue;
        }

        state.planning_succeeded();
        debug!(count = actions.len(), "executing planned actions");
        let step = self.execute_batch(state, actions).await;
        state.update_step(self.config.previous_actions_window);
        step
    }

    /// Run planned actions strictly in order, recording each before the next starts.
    async fn execute_batch(&self, state: &mut AgentState, actions: Vec<Action>) -> Step {
        for action in actions {
            let outcome = self.executor.execute(&action).await;
            state.record(action, &outcome);

            match outcome {
                ExecutionOutcome::Done => {
                    info!("planner declared the listing complete");
                    let url = self.current_listing_url().await;
                    return Step::Finished(RunOutcome::succeeded(url, state.iteration));
                }
                ExecutionOutcome::Error { description } => {
                    warn!(%description, "planner gave up on this batch");
                    break;
                }
                ExecutionOutcome::Succeeded | ExecutionOutcome::Failed { .. } => {
                    self.executor.overlays().dismiss_any().await;
                }
            }
        }
        Step::Continue
    }

    /// Count a round that produced nothing to execute, escalating to direct fill at the
    /// threshold, then back off.
    async fn planning_failed(
        &self,
        state: &mut AgentState,
        listing: &ListingPayload,
        snapshot: Option<&PageSnapshot>,
    ) {
        if state.planning_failed(self.config.max_failed_iterations) {
            info!("planner unproductive; filling fields directly");
            self.direct_fill(state, listing, snapshot).await;
        }
        pause(self.config.planner_retry_delay_ms).await;
    }

    /// Listing URL when the page shows a published listing.
    async fn check_success(&self, snapshot: &PageSnapshot) -> Option<String> {
        let text = self.perceiver.page_text().await.unwrap_or_default();
        if !self.profile.is_success(&snapshot.url, &text) {
            return None;
        }
        let url = self
            .profile
            .listing_url(&snapshot.url, &text)
            .unwrap_or_else(|| snapshot.url.clone());
        info!(%url, "listing published");
        Some(url)
    }

    async fn current_listing_url(&self) -> Option<String> {
        let url = self.executor.locator().dom().current_url().await.ok()?;
        let text = self.perceiver.page_text().await.unwrap_or_default();
        Some(self.profile.listing_url(&url, &text).unwrap_or(url))
    }

    async fn notify(&self, listing: &ListingPayload, outcome: &RunOutcome) {
        let event = RunEvent {
            kind: if outcome.success {
                RunEventKind::RunSucceeded
            } else {
                RunEventKind::RunFailed
            },
            marketplace: self.profile.name.clone(),
            listing: listing.clone(),
            url: outcome.url.clone(),
            error: outcome.error.clone(),
            iterations: outcome.iterations,
            emitted_at: Utc::now(),
        };
        self.notifier.notify(event).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_wire_shapes() {
        let ok = serde_json::to_value(RunOutcome::succeeded(
            Some("https://poshmark.com/listing/tee-1".into()),
            7,
        ))
        .unwrap();
        assert_eq!(ok["success"], true);
        assert_eq!(ok["url"], "https://poshmark.com/listing/tee-1");
        assert!(ok.get("error").is_none());
        assert_eq!(ok["status"], "succeeded");

        let exhausted = serde_json::to_value(RunOutcome::exhausted(50)).unwrap();
        assert_eq!(exhausted["success"], false);
        assert_eq!(exhausted["status"], "exhausted");
        assert!(exhausted["error"].as_str().unwrap().contains("50"));
    }
}

//! Planner-independent heuristics: stuck recovery, direct fill, and the final submit.
//!
//! These are the only actions the loop invents on its own. Everything they execute goes
//! through the same executor and is recorded in `previous_actions`, so the planner sees what
//! was tried.

use action_locator::selectors;
use action_primitives::Action;
use perceiver_structural::PageSnapshot;
use tracing::{debug, info, instrument};

use super::{controller::ListingAgent, state::AgentState};
use crate::payload::ListingPayload;

impl ListingAgent {
    /// Stuck recovery, driven by the validation errors on the page.
    ///
    /// Steps:
    /// 1. "size" error: pick the listing's size, or the configured default
    /// 2. "category" error: pick the listing's category
    /// 3. "price" error: type the price again and close whatever dialog it raised
    /// 4. No matching error: click a "Next" control, else scroll the viewport
    #[instrument(level = "debug", skip_all)]
    pub(super) async fn recover(
        &self,
        state: &mut AgentState,
        listing: &ListingPayload,
        snapshot: &PageSnapshot,
    ) {
        let fields = &self.profile.fields;
        let mut matched = false;

        if snapshot.errors_mentioning("size").next().is_some() {
            matched = true;
            let size = present(listing.size.as_deref())
                .unwrap_or(self.config.default_size.as_str())
                .to_string();
            self.pick_option(state, "size", &fields.size, &size, Some(snapshot))
                .await;
        }

        if snapshot.errors_mentioning("category").next().is_some() {
            matched = true;
            if let Some(category) = present(listing.category.as_deref()) {
                self.pick_option(state, "category", &fields.category, category, Some(snapshot))
                    .await;
            }
        }

        if snapshot.errors_mentioning("price").next().is_some() {
            matched = true;
            if let Some(price) = listing.price_text() {
                self.fill_text(state, "price", &fields.price, &price).await;
            }
            self.executor.overlays().dismiss_any().await;
        }

        if matched {
            return;
        }

        let advance = Action::click_text("Next").with_description("recovery: advance the form");
        let outcome = self.executor.execute(&advance).await;
        let advanced = outcome.is_success();
        state.record(advance, &outcome);
        if !advanced {
            let scroll = Action::scroll(None).with_description("recovery: scroll for more fields");
            let outcome = self.executor.execute(&scroll).await;
            state.record(scroll, &outcome);
        }
    }

    /// Fill known fields straight from the listing, bypassing the planner.
    #[instrument(level = "debug", skip_all)]
    pub(super) async fn direct_fill(
        &self,
        state: &mut AgentState,
        listing: &ListingPayload,
        snapshot: Option<&PageSnapshot>,
    ) {
        let fields = &self.profile.fields;
        let texts = [
            ("title", &fields.title, present(Some(listing.title.as_str())).map(str::to_string)),
            (
                "description",
                &fields.description,
                present(Some(listing.description.as_str())).map(str::to_string),
            ),
            ("brand", &fields.brand, present(listing.brand.as_deref()).map(str::to_string)),
            ("price", &fields.price, listing.price_text()),
            ("original price", &fields.original_price, listing.original_price_text()),
        ];

        let mut filled = 0;
        for (field, candidates, value) in texts {
            let Some(value) = value else { continue };
            if self.fill_text(state, field, candidates, &value).await {
                filled += 1;
            }
        }

        let choices = [
            ("size", &fields.size, listing.size.as_deref()),
            ("category", &fields.category, listing.category.as_deref()),
            ("color", &fields.color, listing.color.as_deref()),
            ("condition", &fields.condition, listing.condition.as_deref()),
        ];
        for (field, candidates, value) in choices {
            let Some(value) = present(value) else { continue };
            if self
                .pick_option(state, field, candidates, value, snapshot)
                .await
            {
                filled += 1;
            }
        }

        info!(filled, "direct fill finished");
    }

    /// Best-effort submit after the iteration cap: "Next", then "List".
    pub(super) async fn final_submit(&self) {
        for label in ["Next", "List"] {
            let action = Action::click_text(label).with_description("final submit");
            let outcome = self.executor.execute(&action).await;
            debug!(label, ?outcome, "final submit click");
        }
    }

    /// Type into the first visible candidate. Returns whether the typing succeeded.
    async fn fill_text(
        &self,
        state: &mut AgentState,
        field: &str,
        candidates: &[String],
        value: &str,
    ) -> bool {
        let locator = self.executor.locator();
        for candidate in candidates {
            if locator.resolve_visible(candidate).await.is_none() {
                continue;
            }
            let action = Action::type_text(candidate.as_str(), value)
                .with_description(format!("direct fill: {field}"));
            let outcome = self.executor.execute(&action).await;
            let typed = outcome.is_success();
            state.record(action, &outcome);
            return typed;
        }
        debug!(field, "no visible input for field");
        false
    }

    /// Open a dropdown for `field` and pick `value`. Dropdowns the snapshot labels with the
    /// field name are tried before the profile's selectors.
    async fn pick_option(
        &self,
        state: &mut AgentState,
        field: &str,
        candidates: &[String],
        value: &str,
        snapshot: Option<&PageSnapshot>,
    ) -> bool {
        let mut targets: Vec<String> = snapshot
            .map(|snapshot| {
                snapshot
                    .dropdowns
                    .iter()
                    .filter(|dropdown| !selectors::is_positional(&dropdown.selector))
                    .filter(|dropdown| {
                        let label = dropdown.section_label.as_deref().unwrap_or_default();
                        label.to_lowercase().contains(field)
                            || dropdown.selector.to_lowercase().contains(field)
                    })
                    .map(|dropdown| dropdown.selector.clone())
                    .collect()
            })
            .unwrap_or_default();
        for candidate in candidates {
            if !targets.contains(candidate) {
                targets.push(candidate.clone());
            }
        }

        let locator = self.executor.locator();
        for target in targets {
            if locator.resolve_visible(&target).await.is_none() {
                continue;
            }
            let action = Action::select(target.as_str(), value)
                .with_description(format!("direct fill: {field}"));
            let outcome = self.executor.execute(&action).await;
            let picked = outcome.is_success();
            state.record(action, &outcome);
            if picked {
                return true;
            }
        }
        debug!(field, value, "no dropdown accepted the value");
        false
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

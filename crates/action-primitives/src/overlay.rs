//! Generic dismissal of confirmation overlays.
//!
//! Most dialogs a listing form throws up (photo crop, price suggestions, "are you sure")
//! close with a confirmation-style button. One handler covers them all:
//!
//! 1. primary-styled buttons inside visible overlays, by a fixed selector list
//! 2. any overlay button whose label is a confirmation word or that carries a primary class
//!
//! An overlay that still has an empty dropdown or text field is never confirmed; it is
//! left open for the planner to fill.

use action_locator::{label_of, normalize_text, selectors, ElementLocator, Located};
use cdp_adapter::ElementHandle;
use perceiver_structural::{SnapshotLimits, StructuralPerceiver};
use tracing::{debug, info};

use crate::{
    gesture::synthetic_click,
    pacing::{pause, Pacing},
};

/// Primary buttons, most specific first.
const PRIMARY_BUTTONS: &[&str] = &[
    "button[class*=\"primary\"]",
    "button[class*=\"Primary\"]",
    "[role=\"button\"][class*=\"primary\"]",
    "button[data-testid*=\"primary\"]",
    "button[data-testid*=\"confirm\"]",
    "button[type=\"submit\"]",
];

const CONFIRM_WORDS: &[&str] = &["done", "apply", "ok", "save", "continue", "yes", "confirm"];

/// Short labels only; "ok" must not match "book now to save".
const MAX_CONFIRM_LABEL_WORDS: usize = 3;

#[derive(Clone)]
pub struct OverlayHandler {
    locator: ElementLocator,
    perceiver: StructuralPerceiver,
    pacing: Pacing,
}

impl OverlayHandler {
    pub fn new(locator: ElementLocator, pacing: Pacing) -> Self {
        let perceiver = StructuralPerceiver::new(locator.clone(), SnapshotLimits::default());
        Self {
            locator,
            perceiver,
            pacing,
        }
    }

    /// Click the first confirmation control found in any visible overlay that has
    /// nothing left to fill.
    pub async fn dismiss_any(&self) -> bool {
        let overlays = self.complete(self.locator.open_overlays().await).await;
        self.dismiss_within(&overlays).await
    }

    /// Dismiss back-to-back overlays; stops at the first round where nothing closed.
    pub async fn dismiss_repeatedly(&self, max_attempts: usize) -> usize {
        let mut handled = 0;
        for _ in 0..max_attempts {
            if !self.dismiss_any().await {
                break;
            }
            handled += 1;
        }
        if handled > 0 {
            info!(handled, "dismissed overlays");
        }
        handled
    }

    /// Poll for an overlay whose text mentions one of `keywords` and dismiss it.
    ///
    /// Used right after typing a price, when some marketplaces pop a suggestion dialog
    /// a moment later.
    pub async fn dismiss_matching(&self, keywords: &[&str]) -> bool {
        for attempt in 0..self.pacing.price_dismiss_attempts.max(1) {
            let mut matching = Vec::new();
            for overlay in self.locator.open_overlays().await {
                let text = normalize_text(&overlay.info.text);
                if keywords.iter().any(|keyword| text.contains(keyword)) {
                    matching.push(overlay);
                }
            }
            let matching = self.complete(matching).await;
            if !matching.is_empty() && self.dismiss_within(&matching).await {
                debug!(attempt, ?keywords, "dismissed matching overlay");
                return true;
            }
            pause(self.pacing.price_dismiss_poll_ms).await;
        }
        false
    }

    /// Overlays without unfilled required fields.
    async fn complete(&self, overlays: Vec<Located>) -> Vec<Located> {
        let mut out = Vec::new();
        for overlay in overlays {
            let modal = self.perceiver.describe_overlay(overlay.clone()).await;
            if modal.has_required_fields {
                info!(
                    overlay = %modal.selector,
                    kind = ?modal.kind,
                    "overlay is blocking on unfilled fields; leaving it open"
                );
                continue;
            }
            out.push(overlay);
        }
        out
    }

    async fn dismiss_within(&self, overlays: &[Located]) -> bool {
        if overlays.is_empty() {
            return false;
        }

        for selector in PRIMARY_BUTTONS {
            for overlay in overlays {
                for button in self.locator.find_visible(Some(overlay.handle), selector).await {
                    if !button.info.is_disabled() && self.press(button.handle, "primary").await {
                        return true;
                    }
                }
            }
        }

        for overlay in overlays {
            for button in self
                .locator
                .find_visible(Some(overlay.handle), selectors::BUTTON)
                .await
            {
                if button.info.is_disabled() {
                    continue;
                }
                let confirm = is_confirmation(&label_of(&button.info));
                let primary = button
                    .info
                    .classes()
                    .any(|class| class.to_ascii_lowercase().contains("primary"));
                if (confirm || primary) && self.press(button.handle, "vocabulary").await {
                    return true;
                }
            }
        }
        false
    }

    async fn press(&self, handle: ElementHandle, via: &'static str) -> bool {
        match synthetic_click(self.locator.dom().as_ref(), handle, &self.pacing).await {
            Ok(()) => {
                debug!(%handle, via, "overlay button pressed");
                pause(self.pacing.overlay_settle_ms).await;
                true
            }
            Err(err) => {
                debug!(%handle, %err, "overlay button press failed");
                false
            }
        }
    }
}

fn is_confirmation(label: &str) -> bool {
    let label = normalize_text(label);
    let words: Vec<&str> = label
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .collect();
    !words.is_empty()
        && words.len() <= MAX_CONFIRM_LABEL_WORDS
        && words.iter().any(|word| CONFIRM_WORDS.contains(word))
}

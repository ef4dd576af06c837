//! Human-plausible timing for synthetic interactions.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Delays applied between interaction steps, in milliseconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pacing {
    /// Random inter-keystroke delay lies in `[keystroke_min_ms, keystroke_max_ms]`.
    pub keystroke_min_ms: u64,
    pub keystroke_max_ms: u64,
    /// Pause between scrolling a target into view and pressing it.
    pub click_settle_ms: u64,
    /// Pause after opening a custom dropdown, before looking for its options.
    pub menu_render_ms: u64,
    /// Pause after dismissing an overlay.
    pub overlay_settle_ms: u64,
    pub price_dismiss_attempts: u32,
    pub price_dismiss_poll_ms: u64,
    /// `wait` actions without `waitMs` sleep this long.
    pub default_wait_ms: u64,
    /// Upper bound on any single `wait` action.
    pub max_wait_ms: u64,
    pub scroll_distance_px: i64,
    pub image_fetch_timeout_ms: u64,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            keystroke_min_ms: 30,
            keystroke_max_ms: 90,
            click_settle_ms: 300,
            menu_render_ms: 500,
            overlay_settle_ms: 500,
            price_dismiss_attempts: 5,
            price_dismiss_poll_ms: 200,
            default_wait_ms: 1_000,
            max_wait_ms: 10_000,
            scroll_distance_px: 500,
            image_fetch_timeout_ms: 15_000,
        }
    }
}

impl Pacing {
    /// No delays at all. Bounded retry counts are kept.
    pub fn instant() -> Self {
        Self {
            keystroke_min_ms: 0,
            keystroke_max_ms: 0,
            click_settle_ms: 0,
            menu_render_ms: 0,
            overlay_settle_ms: 0,
            price_dismiss_poll_ms: 0,
            default_wait_ms: 0,
            ..Self::default()
        }
    }

    pub fn keystroke_delay(&self) -> u64 {
        if self.keystroke_max_ms <= self.keystroke_min_ms {
            return self.keystroke_min_ms;
        }
        rand::thread_rng().gen_range(self.keystroke_min_ms..=self.keystroke_max_ms)
    }

    /// Requested wait clamped to `max_wait_ms`.
    pub fn wait_duration(&self, requested: Option<u64>) -> u64 {
        requested
            .unwrap_or(self.default_wait_ms)
            .min(self.max_wait_ms)
    }

    pub fn image_fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.image_fetch_timeout_ms)
    }
}

/// Sleep for `ms` milliseconds; zero returns immediately.
pub async fn pause(ms: u64) {
    if ms > 0 {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}

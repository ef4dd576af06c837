//! Action executor and its primitives
//!
//! One handler per action kind:
//! 1. type_text - clear and type character by character
//! 2. click - selector, then visible text, then dropdown options
//! 3. select - native listbox or custom widget
//! 4. upload - fetch images and inject them into a file input
//! 5. scroll - element into view, or the viewport
//! 6. wait - bounded sleep
//!
//! `done` and `error` are terminal signals and never touch the page.

mod click;
mod scroll;
mod select;
mod type_text;
mod upload;
mod wait;

pub use click::*;
pub use scroll::*;
pub use select::*;
pub use type_text::*;
pub use upload::*;
pub use wait::*;

use std::{any::Any, panic::AssertUnwindSafe, sync::Arc};

use action_locator::ElementLocator;
use cdp_adapter::{DomPort, ElementHandle};
use futures::FutureExt;
use tracing::{debug, info, instrument, warn};

use crate::{
    errors::ActionError,
    fetch::ImageFetcher,
    overlay::OverlayHandler,
    pacing::Pacing,
    types::{Action, ExecutionOutcome},
};

/// Marketplace-specific knobs the handlers consult.
#[derive(Clone, Debug)]
pub struct ExecutorOptions {
    /// Upper bound on images injected by one `upload`.
    pub max_images: usize,
    /// Attribute names or attribute-value substrings that identify a price input.
    pub price_markers: Vec<String>,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            max_images: 12,
            price_markers: vec!["price".to_string()],
        }
    }
}

/// Performs planner actions against the live document, one at a time.
#[derive(Clone)]
pub struct ActionExecutor {
    locator: ElementLocator,
    overlays: OverlayHandler,
    fetcher: Arc<dyn ImageFetcher>,
    pacing: Pacing,
    options: ExecutorOptions,
}

impl ActionExecutor {
    pub fn new(
        locator: ElementLocator,
        fetcher: Arc<dyn ImageFetcher>,
        pacing: Pacing,
        options: ExecutorOptions,
    ) -> Self {
        let overlays = OverlayHandler::new(locator.clone(), pacing.clone());
        Self {
            locator,
            overlays,
            fetcher,
            pacing,
            options,
        }
    }

    pub fn locator(&self) -> &ElementLocator {
        &self.locator
    }

    pub fn overlays(&self) -> &OverlayHandler {
        &self.overlays
    }

    pub fn pacing(&self) -> &Pacing {
        &self.pacing
    }

    pub fn options(&self) -> &ExecutorOptions {
        &self.options
    }

    pub(crate) fn dom(&self) -> &dyn DomPort {
        self.locator.dom().as_ref()
    }

    pub(crate) fn fetcher(&self) -> &dyn ImageFetcher {
        self.fetcher.as_ref()
    }

    /// Run one action. Never fails and never panics: handler errors and panics become
    /// [`ExecutionOutcome::Failed`].
    #[instrument(level = "debug", skip(self, action), fields(action = action.kind()))]
    pub async fn execute(&self, action: &Action) -> ExecutionOutcome {
        let outcome = match AssertUnwindSafe(self.dispatch(action)).catch_unwind().await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(err)) => ExecutionOutcome::failed(err.to_string()),
            Err(panic) => {
                let err = ActionError::Panicked(panic_message(panic.as_ref()));
                warn!(action = action.kind(), %err, "action handler panicked");
                ExecutionOutcome::failed(err.to_string())
            }
        };

        match &outcome {
            ExecutionOutcome::Failed { reason } => info!(
                action = action.kind(),
                selector = action.selector().unwrap_or_default(),
                reason = %reason,
                "action failed"
            ),
            other => debug!(action = action.kind(), outcome = ?other, "action finished"),
        }
        outcome
    }

    async fn dispatch(&self, action: &Action) -> Result<ExecutionOutcome, ActionError> {
        match action {
            Action::Type {
                selector, value, ..
            } => execute_type_text(self, required(selector, "type")?, value).await?,
            Action::Click {
                selector, value, ..
            } => execute_click(self, selector.as_deref(), value.as_deref()).await?,
            Action::Select {
                selector, value, ..
            } => execute_select(self, required(selector, "select")?, value).await?,
            Action::Upload {
                selector, value, ..
            } => execute_upload(self, selector.as_deref(), value).await?,
            Action::Scroll { selector, .. } => execute_scroll(self, selector.as_deref()).await?,
            Action::Wait { wait_ms, .. } => execute_wait(self, *wait_ms).await,
            Action::Done { .. } => return Ok(ExecutionOutcome::Done),
            Action::Error { description } => {
                let description = description.clone().unwrap_or_default();
                warn!(%description, "planner reported an error");
                return Ok(ExecutionOutcome::Error { description });
            }
            Action::Unknown { kind, .. } => {
                return Ok(ExecutionOutcome::failed(format!(
                    "unsupported action kind '{kind}'"
                )))
            }
        }
        Ok(ExecutionOutcome::Succeeded)
    }

    /// Resolve a selector to an element, or fail with `ElementNotFound`.
    pub(crate) async fn target(&self, selector: &str) -> Result<ElementHandle, ActionError> {
        self.locator
            .resolve(selector)
            .await
            .ok_or_else(|| ActionError::not_found(selector))
    }
}

fn required<'a>(selector: &'a Option<String>, kind: &str) -> Result<&'a str, ActionError> {
    selector
        .as_deref()
        .ok_or_else(|| ActionError::invalid(format!("{kind} action without a selector")))
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

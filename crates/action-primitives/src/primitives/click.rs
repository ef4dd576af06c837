//! Click primitive - Click element with fallback strategies

use cdp_adapter::ElementHandle;
use tracing::{debug, info};

use crate::{errors::ActionError, gesture::synthetic_click, primitives::ActionExecutor};

/// Execute click primitive
///
/// Steps:
/// 1. Resolve by selector
/// 2. Else resolve by visible text (the action's value, else the selector read as text)
/// 3. Else search open dropdown options for that text
/// 4. Synthetic click: scroll into view, settle, mouseover, mousedown, mouseup, native click
pub async fn execute_click(
    executor: &ActionExecutor,
    selector: Option<&str>,
    text: Option<&str>,
) -> Result<(), ActionError> {
    info!(
        selector = selector.unwrap_or_default(),
        text = text.unwrap_or_default(),
        "Executing click primitive"
    );

    let handle = locate(executor, selector, text).await?;
    synthetic_click(executor.dom(), handle, executor.pacing()).await?;
    debug!(%handle, "Click completed");
    Ok(())
}

async fn locate(
    executor: &ActionExecutor,
    selector: Option<&str>,
    text: Option<&str>,
) -> Result<ElementHandle, ActionError> {
    let locator = executor.locator();
    if let Some(selector) = selector {
        if let Some(handle) = locator.resolve(selector).await {
            return Ok(handle);
        }
    }

    let Some(needle) = text.or(selector).filter(|t| !t.trim().is_empty()) else {
        return Err(ActionError::invalid("click action without selector or text"));
    };
    if let Some(handle) = locator.resolve_by_text(needle).await {
        debug!(needle, "click target found by text");
        return Ok(handle);
    }
    if let Some(handle) = locator.resolve_option_by_text(needle).await {
        debug!(needle, "click target found among dropdown options");
        return Ok(handle);
    }
    Err(ActionError::not_found(needle))
}

//! Type primitive - human-paced typing into inputs and text areas

use cdp_adapter::{DomEvent, ElementInfo};
use tracing::{debug, info};

use crate::{errors::ActionError, pacing::pause, primitives::ActionExecutor};

/// Overlay text that identifies a price-suggestion dialog.
const PRICE_OVERLAY_KEYWORDS: &[&str] = &["price", "suggest"];

/// Execute type primitive
///
/// Steps:
/// 1. Resolve the target element
/// 2. Focus and clear it
/// 3. Type one character at a time: keydown, value update, input, keyup, random pause
/// 4. Fire change
/// 5. For price inputs, dismiss a price-suggestion overlay if one appears
/// 6. Fire blur
pub async fn execute_type_text(
    executor: &ActionExecutor,
    selector: &str,
    text: &str,
) -> Result<(), ActionError> {
    info!(selector, chars = text.chars().count(), "Executing type primitive");

    let handle = executor.target(selector).await?;
    let dom = executor.dom();
    let info = dom.describe(handle).await?;
    let price_field = is_price_field(selector, &info, &executor.options().price_markers);

    dom.focus(handle).await?;
    dom.dispatch(handle, DomEvent::Focus).await?;
    dom.set_value(handle, "").await?;
    dom.dispatch(handle, DomEvent::Input).await?;

    let mut typed = String::with_capacity(text.len());
    for ch in text.chars() {
        let key = ch.to_string();
        dom.dispatch(handle, DomEvent::KeyDown { key: key.clone() })
            .await?;
        typed.push(ch);
        dom.set_value(handle, &typed).await?;
        dom.dispatch(handle, DomEvent::Input).await?;
        dom.dispatch(handle, DomEvent::KeyUp { key }).await?;
        pause(executor.pacing().keystroke_delay()).await;
    }

    dom.dispatch(handle, DomEvent::Change).await?;

    if price_field {
        let dismissed = executor
            .overlays()
            .dismiss_matching(PRICE_OVERLAY_KEYWORDS)
            .await;
        debug!(selector, dismissed, "price field typed");
    }

    // The price dialog may have replaced the element; blur is best effort.
    if let Err(err) = dom.dispatch(handle, DomEvent::Blur).await {
        debug!(selector, %err, "blur skipped");
    }
    Ok(())
}

/// A price input is recognized by its selector, a marketplace marker attribute, or its
/// placeholder.
pub fn is_price_field(selector: &str, info: &ElementInfo, markers: &[String]) -> bool {
    if selector.to_lowercase().contains("price") {
        return true;
    }
    let marked = markers.iter().any(|marker| {
        info.attributes.iter().any(|(name, value)| {
            name == marker || (name.starts_with("data-") && value.contains(marker.as_str()))
        })
    });
    if marked {
        return true;
    }
    info.attr("placeholder")
        .map(|p| p.to_lowercase().contains("price") || p.contains('$'))
        .unwrap_or(false)
}

//! Scroll primitive - Scroll an element into view, or the viewport

use tracing::info;

use crate::{errors::ActionError, primitives::ActionExecutor};

/// Execute scroll primitive
///
/// With a selector the element is scrolled into view and a miss is a failure.
/// Without one the viewport moves down by the configured distance.
pub async fn execute_scroll(
    executor: &ActionExecutor,
    selector: Option<&str>,
) -> Result<(), ActionError> {
    match selector {
        Some(selector) => {
            info!(selector, "Executing scroll primitive");
            let handle = executor.target(selector).await?;
            executor.dom().scroll_into_view(handle).await?;
        }
        None => {
            let distance = executor.pacing().scroll_distance_px;
            info!(distance, "Executing viewport scroll");
            executor.dom().scroll_viewport(distance).await?;
        }
    }
    Ok(())
}

//! Wait primitive - bounded sleep

use tracing::debug;

use crate::{pacing::pause, primitives::ActionExecutor};

/// Sleep for the requested duration, or the default, capped at `max_wait_ms`.
pub async fn execute_wait(executor: &ActionExecutor, requested_ms: Option<u64>) {
    let ms = executor.pacing().wait_duration(requested_ms);
    debug!(?requested_ms, ms, "Executing wait primitive");
    pause(ms).await;
}

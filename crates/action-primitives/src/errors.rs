//! Error types for action primitives

use cdp_adapter::{AdapterError, AdapterErrorKind};
use thiserror::Error;

/// Why a single action could not be carried out.
///
/// These never leave the executor as errors: [`ActionExecutor::execute`](crate::ActionExecutor::execute)
/// folds them into [`ExecutionOutcome::Failed`](crate::ExecutionOutcome) so the planner can see them.
#[derive(Debug, Error, Clone)]
pub enum ActionError {
    /// No element matched the selector or any text fallback
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// Dropdown option was not found
    #[error("Option not found in dropdown: {0}")]
    OptionNotFound(String),

    /// Action is missing a field or carries an unusable value
    #[error("Invalid action value: {0}")]
    InvalidValue(String),

    /// An image could not be downloaded
    #[error("Image fetch failed: {0}")]
    Fetch(String),

    /// Element went away while the action was running
    #[error("Stale element: {0}")]
    Stale(String),

    /// CDP communication or script error
    #[error("CDP I/O error: {0}")]
    CdpIo(String),

    /// A handler panicked
    #[error("Handler panicked: {0}")]
    Panicked(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ActionError {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ActionError::Stale(_) | ActionError::CdpIo(_) | ActionError::Fetch(_)
        )
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        ActionError::ElementNotFound(what.into())
    }

    pub fn invalid(what: impl Into<String>) -> Self {
        ActionError::InvalidValue(what.into())
    }
}

impl From<AdapterError> for ActionError {
    fn from(err: AdapterError) -> Self {
        let detail = err.to_string();
        match err.kind {
            AdapterErrorKind::StaleHandle => ActionError::Stale(detail),
            AdapterErrorKind::InvalidSelector => ActionError::ElementNotFound(detail),
            AdapterErrorKind::Internal => ActionError::Internal(detail),
            _ => ActionError::CdpIo(detail),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adapter_error_mapping() {
        let stale: ActionError = AdapterError::new(AdapterErrorKind::StaleHandle).into();
        assert!(matches!(stale, ActionError::Stale(_)));
        assert!(stale.is_retryable());

        let selector: ActionError = AdapterError::invalid_selector("div[").into();
        assert!(matches!(selector, ActionError::ElementNotFound(_)));
        assert!(!selector.is_retryable());
    }
}

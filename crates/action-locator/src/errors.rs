//! Error types for the locator

use cdp_adapter::{AdapterError, AdapterErrorKind};
use thiserror::Error;

/// Locator error enumeration
///
/// Only visible inside the crate's fallible helpers; the public `resolve*` calls turn every
/// error into "not found".
#[derive(Debug, Error, Clone)]
pub enum LocatorError {
    /// Selector is a positional placeholder and must not be re-resolved
    #[error("Positional selector refused: {0}")]
    PositionalSelector(String),

    /// Selector could not be parsed by the document
    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    /// Element went away between query and inspection
    #[error("Stale element: {0}")]
    Stale(String),

    /// CDP communication error
    #[error("CDP error: {0}")]
    CdpError(String),
}

impl LocatorError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, LocatorError::Stale(_) | LocatorError::CdpError(_))
    }
}

impl From<AdapterError> for LocatorError {
    fn from(err: AdapterError) -> Self {
        let detail = err.to_string();
        match err.kind {
            AdapterErrorKind::InvalidSelector => LocatorError::InvalidSelector(detail),
            AdapterErrorKind::StaleHandle => LocatorError::Stale(detail),
            _ => LocatorError::CdpError(detail),
        }
    }
}

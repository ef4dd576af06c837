use thiserror::Error;

/// Errors emitted by the agent-core crate.
///
/// Nothing inside the loop surfaces these; they guard the edges of a run (bad input, unknown
/// marketplace, unusable configuration).
#[derive(Debug, Error)]
pub enum AgentError {
    /// Raised when the listing payload cannot be posted anywhere.
    #[error("invalid listing: {0}")]
    InvalidListing(String),

    /// Raised when a marketplace name has no built-in profile.
    #[error("unknown marketplace: {0}")]
    UnknownMarketplace(String),

    /// Raised when a client or notifier cannot be built from configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl AgentError {
    /// Helper for payload validation failures.
    pub fn invalid_listing(message: impl Into<String>) -> Self {
        Self::InvalidListing(message.into())
    }

    /// Helper for configuration failures.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

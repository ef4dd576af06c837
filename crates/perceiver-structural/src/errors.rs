use cdp_adapter::AdapterError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PerceiverError {
    #[error("page unavailable: {0}")]
    PageUnavailable(#[from] AdapterError),
}

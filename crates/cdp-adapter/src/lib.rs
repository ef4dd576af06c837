//! Live document port for the listing agent.
//!
//! Everything above this crate sees the marketplace page only through [`DomPort`]: a small set
//! of element queries, descriptions, and mutations keyed by opaque [`ElementHandle`]s. The
//! production implementation drives Chromium over the DevTools protocol ([`ChromiumDom`]); the
//! `fake-dom` feature exposes an in-memory document used by the test suites of the upper layers.

pub mod chromium;
pub mod dom;
mod scripts;
mod util;

#[cfg(any(test, feature = "fake-dom"))]
pub mod fake;

pub use chromium::ChromiumDom;
pub use config::CdpConfig;
pub use dom::{
    ComputedStyle, DomEvent, DomPort, ElementInfo, FilePayload, OptionInfo, Rect,
};
pub use error::{AdapterError, AdapterErrorKind};
pub use ids::ElementHandle;

pub mod ids {
    use serde::{Deserialize, Serialize};
    use std::fmt;

    /// Opaque reference to an element of the live document.
    ///
    /// Handles stay stable for the same element while the document lives; once the element is
    /// detached the port reports [`AdapterErrorKind::StaleHandle`](crate::AdapterErrorKind).
    #[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct ElementHandle(pub u64);

    impl fmt::Display for ElementHandle {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "el#{}", self.0)
        }
    }
}

pub mod error {
    use serde::{Deserialize, Serialize};
    use std::fmt;
    use thiserror::Error;

    /// High-level error categories surfaced by the adapter.
    #[derive(Clone, Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
    pub enum AdapterErrorKind {
        #[error("navigation timed out")]
        NavTimeout,
        #[error("cdp i/o failure")]
        CdpIo,
        #[error("invalid selector")]
        InvalidSelector,
        #[error("element handle is stale")]
        StaleHandle,
        #[error("script evaluation failed")]
        Script,
        #[error("browser launch failed")]
        Launch,
        #[error("internal error")]
        Internal,
    }

    /// Enriched error metadata passed back to higher layers.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct AdapterError {
        pub kind: AdapterErrorKind,
        pub hint: Option<String>,
        pub retriable: bool,
        pub data: Option<serde_json::Value>,
    }

    impl fmt::Display for AdapterError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.kind)?;
            if let Some(hint) = &self.hint {
                write!(f, ": {}", hint)?;
            }
            Ok(())
        }
    }

    impl std::error::Error for AdapterError {}

    impl AdapterError {
        pub fn new(kind: AdapterErrorKind) -> Self {
            Self {
                kind,
                hint: None,
                retriable: false,
                data: None,
            }
        }

        pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
            self.hint = Some(hint.into());
            self
        }

        pub fn retriable(mut self, flag: bool) -> Self {
            self.retriable = flag;
            self
        }

        pub fn with_data(mut self, data: serde_json::Value) -> Self {
            self.data = Some(data);
            self
        }

        pub fn invalid_selector(selector: &str) -> Self {
            Self::new(AdapterErrorKind::InvalidSelector).with_hint(selector.to_string())
        }

        pub fn stale(handle: crate::ElementHandle) -> Self {
            Self::new(AdapterErrorKind::StaleHandle).with_hint(handle.to_string())
        }

        /// Transient failures: a navigation timeout, or anything marked retriable.
        pub fn is_retryable(&self) -> bool {
            self.retriable || matches!(self.kind, AdapterErrorKind::NavTimeout)
        }
    }
}

pub mod config {
    use crate::util::detect_chrome_executable;
    use serde::{Deserialize, Serialize};
    use std::{
        env,
        path::{Path, PathBuf},
    };

    /// Configuration for launching the browser the agent drives.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    #[serde(default)]
    pub struct CdpConfig {
        pub executable: PathBuf,
        pub user_data_dir: PathBuf,
        pub headless: bool,
        pub launch_timeout_ms: u64,
        pub request_timeout_ms: u64,
        pub window_width: u32,
        pub window_height: u32,
    }

    impl Default for CdpConfig {
        fn default() -> Self {
            Self {
                executable: default_chrome_path(),
                user_data_dir: default_profile_dir(),
                headless: resolve_headless_default(),
                launch_timeout_ms: 20_000,
                request_timeout_ms: 30_000,
                window_width: 1366,
                window_height: 900,
            }
        }
    }

    fn resolve_headless_default() -> bool {
        // "0", "false", "no", "off" mean headful
        match env::var("RELIST_HEADLESS") {
            Ok(value) => {
                let lower = value.to_ascii_lowercase();
                !matches!(lower.as_str(), "0" | "false" | "no" | "off")
            }
            Err(_) => true,
        }
    }

    fn default_chrome_path() -> PathBuf {
        detect_chrome_executable().unwrap_or_default()
    }

    fn default_profile_dir() -> PathBuf {
        if let Ok(path) = env::var("RELIST_CHROME_PROFILE") {
            return PathBuf::from(path);
        }

        let default = Path::new("./.relist-profile");
        default.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(AdapterError::new(AdapterErrorKind::NavTimeout).is_retryable());
        assert!(AdapterError::new(AdapterErrorKind::CdpIo)
            .retriable(true)
            .is_retryable());
        assert!(!AdapterError::invalid_selector("div[").is_retryable());
        assert!(!AdapterError::stale(ElementHandle(7)).is_retryable());
    }

    #[test]
    fn test_error_display_carries_hint() {
        let err = AdapterError::stale(ElementHandle(7));
        assert_eq!(err.to_string(), "element handle is stale: el#7");
    }
}

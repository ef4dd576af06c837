//! Resolution strategies and their fallback order.

use serde::{Deserialize, Serialize};

use crate::selectors;

/// One way of finding an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LocatorStrategy {
    /// Direct structural lookup of a selector.
    Selector,
    /// Options inside an open overlay.
    OverlayOptions,
    /// Options inside an open dropdown menu that is not part of an overlay.
    MenuOptions,
    /// Buttons, links, list items anywhere.
    Interactive,
}

impl LocatorStrategy {
    /// Fallback order of text resolution.
    pub const TEXT_ORDER: [LocatorStrategy; 3] = [
        LocatorStrategy::OverlayOptions,
        LocatorStrategy::MenuOptions,
        LocatorStrategy::Interactive,
    ];

    /// Fallback order when only dropdown entries are acceptable.
    pub const OPTION_ORDER: [LocatorStrategy; 2] =
        [LocatorStrategy::OverlayOptions, LocatorStrategy::MenuOptions];

    pub fn name(&self) -> &'static str {
        match self {
            LocatorStrategy::Selector => "selector",
            LocatorStrategy::OverlayOptions => "overlay-options",
            LocatorStrategy::MenuOptions => "menu-options",
            LocatorStrategy::Interactive => "interactive",
        }
    }

    /// Selector of the candidates this strategy scans.
    pub fn candidate_selector(&self) -> Option<&'static str> {
        match self {
            LocatorStrategy::Selector => None,
            LocatorStrategy::OverlayOptions | LocatorStrategy::MenuOptions => {
                Some(selectors::OPTION)
            }
            LocatorStrategy::Interactive => Some(selectors::INTERACTIVE),
        }
    }
}

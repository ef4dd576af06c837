//! Element Locator - resolves semantic references to live elements
//!
//! Resolution is layered:
//! - structural selectors (positional fallbacks are refused)
//! - visible text, searched in priority order: options of open overlays, options of open
//!   dropdown menus, then any interactive control on the page
//!
//! Lookup errors never escape the public API; they are logged and reported as "not found".

pub mod errors;
pub mod resolver;
pub mod selectors;
pub mod strategies;
pub mod text;

pub use errors::*;
pub use resolver::*;
pub use strategies::*;
pub use text::{normalize_text, text_matches};

//! Action primitives for the listing agent
//!
//! This crate turns planner actions into interactions with the live document:
//! - the [`Action`] vocabulary and its wire format
//! - [`ActionExecutor`]: type, click, select, upload, scroll, wait, each failure contained
//! - [`OverlayHandler`]: generic dismissal of confirmation dialogs
//! - human-plausible [`Pacing`] and the synthetic pointer sequence shared by all clicks
//! - [`ImageFetcher`] for uploads

pub mod errors;
pub mod fetch;
mod gesture;
pub mod overlay;
pub mod pacing;
mod primitives;
pub mod types;

pub use errors::*;
pub use fetch::{HttpImageFetcher, ImageFetcher};
pub use gesture::synthetic_click;
pub use overlay::OverlayHandler;
pub use pacing::Pacing;
pub use primitives::*;
pub use types::*;

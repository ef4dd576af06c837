//! The listing loop (observe, plan, act, recover).
//!
//! # Architecture
//!
//! ```text
//! upload images (if any), close crop dialogs
//! while iteration < max:
//!     if an overlay was dismissed: continue
//!     snapshot = capture()
//!     if published: succeed
//!     if stuck for `stuck_threshold` repeats: recover, continue
//!     actions = planner.plan(snapshot, listing, step, recent actions)
//!     if no actions: count failure (direct fill at threshold), back off, continue
//!     execute actions in order; `done` succeeds, `error` ends the batch
//! final submit; report exhaustion
//! ```
//!
//! # Key Components
//!
//! - [`AgentLoopConfig`]: bounds and delays
//! - [`AgentState`]: counters and the action log of one run
//! - [`ListingAgent`]: the orchestrator

pub mod config;
pub mod controller;
mod recovery;
pub mod state;

pub use config::AgentLoopConfig;
pub use controller::{ListingAgent, ListingAgentBuilder, RunOutcome, RunStatus};
pub use state::{ActionRecord, AgentState, CurrentStep, Fingerprint, Phase};

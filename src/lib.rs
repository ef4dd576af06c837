//! Relist command line
//!
//! Exposes the CLI and its configuration for integration testing

pub mod cli;
pub mod config;

pub use config::{Config, ConfigError, NotificationConfig};

pub mod app;
pub mod commands;
pub mod dispatch;
pub mod env;
pub mod output;
pub mod profiles;
pub mod run;
pub mod runtime;
pub mod snapshot;

pub use app::run;
pub use env::{CliArgs, LogFormat};
pub use profiles::{cmd_profiles, ProfilesArgs};
pub use run::{cmd_run, read_listing, RunArgs};
pub use snapshot::{cmd_snapshot, SnapshotArgs};

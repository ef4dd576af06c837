use clap::Subcommand;

use super::profiles::ProfilesArgs;
use super::run::RunArgs;
use super::snapshot::SnapshotArgs;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Fill in and publish one listing on a marketplace
    Run(RunArgs),

    /// Capture the structure of a page and print it as JSON
    Snapshot(SnapshotArgs),

    /// List the built-in marketplace profiles
    Profiles(ProfilesArgs),
}

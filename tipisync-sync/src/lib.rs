//! # tipisync-sync
//!
//! Run orchestration for the app store mirror: fetch upstream, snapshot both
//! sides, classify, apply, write the changelog and publish.
//!
//! Version control and package mutation are injected through the [`Vcs`]
//! and [`PackageMutator`] traits; [`GitCli`] and [`FsMutator`] are the real
//! implementations. Entry points live in [`pipeline`]:
//!
//! | Command        | Function                      |
//! |----------------|-------------------------------|
//! | `plan`         | [`pipeline::plan`]            |
//! | `diff`         | [`pipeline::diff`]            |
//! | `sync`         | [`pipeline::run_sync`]        |
//! | `filter`       | [`pipeline::run_filter`]      |
//! | `mirror`       | [`pipeline::run_mirror`]      |
//! | `setup-custom` | [`pipeline::run_setup_custom`]|

pub mod changelog;
pub mod diff;
pub mod error;
pub mod mutate;
pub mod pipeline;
pub mod report;
pub mod upstream;
pub mod vcs;

pub use diff::{FileDiff, PackageDiff};
pub use error::SyncError;
pub use mutate::{FsMutator, PackageMutator};
pub use pipeline::{Plan, RunOptions, SyncEnv};
pub use report::{MutationFailure, PublishOutcome, RunReport};
pub use upstream::UpstreamCheckout;
pub use vcs::{GitCli, Vcs, VcsError};

pub mod diff;
pub mod filter;
pub mod mirror;
pub mod output;
pub mod plan;
pub mod setup_custom;
pub mod sync;

use std::process::ExitCode;

/// How a successful command maps onto the process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Exit 0.
    NoChanges,
    /// Exit 1, so CI can tell a run that moved packages from one that did not.
    Changes,
}

impl Outcome {
    pub fn from_changes(changed: bool) -> Self {
        if changed {
            Outcome::Changes
        } else {
            Outcome::NoChanges
        }
    }

    pub fn exit_code(self) -> ExitCode {
        match self {
            Outcome::NoChanges => ExitCode::SUCCESS,
            Outcome::Changes => ExitCode::from(1),
        }
    }
}

//! `tipisync filter`: drop local apps the policy does not include.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;

use tipisync_sync::{pipeline, FsMutator, GitCli, RunOptions, SyncEnv};

use super::{output, Outcome};

/// Arguments for `tipisync filter`.
#[derive(Args, Debug)]
pub struct FilterArgs {
    /// List what would be removed without deleting anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Commit the removals on the current branch (never pushes).
    #[arg(long, conflicts_with = "dry_run")]
    pub commit: bool,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl FilterArgs {
    pub fn run(self, root: &Path) -> Result<Outcome> {
        let git = GitCli::new(root);
        let env = SyncEnv::new(root, &git, &FsMutator);
        let opts = RunOptions {
            dry_run: self.dry_run,
            publish: self.commit,
        };

        let report = pipeline::run_filter(env, opts).context("filter failed")?;
        if self.json {
            output::print_report_json(&report)?;
        } else {
            output::print_report("filter", &report);
        }
        Ok(Outcome::from_changes(report.has_changes()))
    }
}

//! `tipisync sync`: apply upstream adds and updates allowed by the policy.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;

use tipisync_sync::{pipeline, FsMutator, GitCli, RunOptions, SyncEnv};

use super::{output, Outcome};

/// Arguments for `tipisync sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Classify and report without touching apps/ or git.
    #[arg(long)]
    pub dry_run: bool,

    /// Apply changes and write the changelog, but do not commit or push.
    #[arg(long)]
    pub no_publish: bool,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl SyncArgs {
    pub fn run(self, root: &Path) -> Result<Outcome> {
        let git = GitCli::new(root);
        let env = SyncEnv::new(root, &git, &FsMutator);
        let opts = RunOptions {
            dry_run: self.dry_run,
            publish: !self.no_publish,
        };

        let report = pipeline::run_sync(env, opts).context("sync failed")?;
        if self.json {
            output::print_report_json(&report)?;
        } else {
            output::print_report("sync", &report);
        }
        Ok(Outcome::from_changes(report.has_changes()))
    }
}

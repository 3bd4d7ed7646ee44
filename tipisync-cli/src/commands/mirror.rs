//! `tipisync mirror`: make the upstream branch a copy of upstream's apps.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;

use tipisync_sync::{pipeline, FsMutator, GitCli, RunOptions, SyncEnv};

use super::{output, Outcome};

/// Arguments for `tipisync mirror`.
#[derive(Args, Debug)]
pub struct MirrorArgs {
    /// Compare against the current branch; no checkout, copy or push.
    #[arg(long)]
    pub dry_run: bool,

    /// Replace packages and write the changelog, but do not commit or push.
    #[arg(long)]
    pub no_publish: bool,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl MirrorArgs {
    pub fn run(self, root: &Path) -> Result<Outcome> {
        let git = GitCli::new(root);
        let env = SyncEnv::new(root, &git, &FsMutator);
        let opts = RunOptions {
            dry_run: self.dry_run,
            publish: !self.no_publish,
        };

        let report = pipeline::run_mirror(env, opts).context("mirror failed")?;
        if self.json {
            output::print_report_json(&report)?;
        } else {
            output::print_report("mirror", &report);
        }
        Ok(Outcome::from_changes(report.has_changes()))
    }
}

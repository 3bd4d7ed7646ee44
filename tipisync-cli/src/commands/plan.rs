//! `tipisync plan`: classification only.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use tipisync_sync::{pipeline, FsMutator, GitCli, SyncEnv};

use super::{output, Outcome};

/// Arguments for `tipisync plan`.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Use an existing upstream checkout instead of cloning.
    #[arg(long, value_name = "DIR")]
    pub upstream: Option<PathBuf>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl PlanArgs {
    pub fn run(self, root: &Path) -> Result<Outcome> {
        let git = GitCli::new(root);
        let env = SyncEnv::new(root, &git, &FsMutator);

        let plan = pipeline::plan(env, self.upstream.as_deref()).context("plan failed")?;
        if self.json {
            output::print_plan_json(&plan.changes)?;
        } else {
            println!(
                "Plan for {} ({} mode) against {} @ {}",
                root.display(),
                plan.config.policy.sync_mode,
                plan.config.upstream.url,
                plan.config.upstream.branch
            );
            output::print_plan_table(&plan.changes);
        }
        Ok(Outcome::NoChanges)
    }
}

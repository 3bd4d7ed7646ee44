//! `tipisync setup-custom`: build the custom branch from main.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;

use tipisync_sync::{pipeline, FsMutator, GitCli, RunOptions, SyncEnv};

use super::{output, Outcome};

/// Arguments for `tipisync setup-custom`.
#[derive(Args, Debug)]
pub struct SetupCustomArgs {
    /// Inspect the current branch and list what would be removed.
    #[arg(long)]
    pub dry_run: bool,

    /// Prune the branch but do not commit or push.
    #[arg(long)]
    pub no_publish: bool,
}

impl SetupCustomArgs {
    pub fn run(self, root: &Path) -> Result<Outcome> {
        let git = GitCli::new(root);
        let env = SyncEnv::new(root, &git, &FsMutator);
        let opts = RunOptions {
            dry_run: self.dry_run,
            publish: !self.no_publish,
        };

        let report = pipeline::run_setup_custom(env, opts).context("setup-custom failed")?;
        output::print_report("setup-custom", &report);
        if !report.kept.is_empty() {
            println!("Custom apps:");
            for name in &report.kept {
                println!("    {name}");
            }
        }
        Ok(Outcome::NoChanges)
    }
}

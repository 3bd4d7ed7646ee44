//! `tipisync diff <app>`: unified diff of one app against upstream.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use tipisync_core::PackageName;
use tipisync_sync::{pipeline, FsMutator, GitCli, SyncEnv};

use super::Outcome;

/// Arguments for `tipisync diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {
    /// App directory name under apps/.
    pub app: String,

    /// Use an existing upstream checkout instead of cloning.
    #[arg(long, value_name = "DIR")]
    pub upstream: Option<PathBuf>,
}

impl DiffArgs {
    pub fn run(self, root: &Path) -> Result<Outcome> {
        let git = GitCli::new(root);
        let env = SyncEnv::new(root, &git, &FsMutator);
        let name = PackageName::from(self.app.as_str());

        let result = pipeline::diff(env, &name, self.upstream.as_deref())
            .with_context(|| format!("diff failed for '{}'", self.app))?;

        if result.is_empty() {
            println!("No differences for '{}'.", result.name);
            return Ok(Outcome::NoChanges);
        }

        for diff in &result.diffs {
            print!("{}", diff.unified_diff);
            if !diff.unified_diff.ends_with('\n') {
                println!();
            }
        }
        for path in &result.binary {
            println!("Binary files differ: apps/{}/{}", result.name, path.display());
        }
        Ok(Outcome::NoChanges)
    }
}

//! Version-control seam.
//!
//! The engine never spawns processes; orchestration talks to git through the
//! [`Vcs`] trait so tests can substitute a fake. [`GitCli`] is the real
//! implementation and runs `git` inside an explicit repository root.

use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;

/// A failed git invocation.
#[derive(Debug, Error)]
pub enum VcsError {
    /// `git` could not be started at all.
    #[error("failed to run git: {source}")]
    Spawn {
        #[source]
        source: std::io::Error,
    },

    /// `git` ran and exited non-zero.
    #[error("`git {args}` failed: {stderr}")]
    Command { args: String, stderr: String },
}

/// Operations the sync workflows need from version control.
pub trait Vcs {
    /// Shallow-clone `branch` of `url` into `dest`.
    fn clone_shallow(&self, url: &str, branch: &str, dest: &Path) -> Result<(), VcsError>;
    /// Name of the checked-out branch; an error on a detached HEAD.
    fn current_branch(&self) -> Result<String, VcsError>;
    fn checkout(&self, branch: &str) -> Result<(), VcsError>;
    /// Create `branch` from HEAD and check it out.
    fn create_branch(&self, branch: &str) -> Result<(), VcsError>;
    /// Whether the working tree has uncommitted changes under `pathspec`.
    fn has_changes(&self, pathspec: &str) -> Result<bool, VcsError>;
    /// Stage everything (including deletions) under `pathspec`.
    fn add(&self, pathspec: &str) -> Result<(), VcsError>;
    fn commit(&self, message: &str) -> Result<(), VcsError>;
    fn push(&self, branch: &str, force: bool) -> Result<(), VcsError>;
}

/// [`Vcs`] backed by the `git` executable.
pub struct GitCli {
    root: PathBuf,
}

impl GitCli {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Run a git command in the repository root and return trimmed stdout.
    fn git(&self, args: &[&str]) -> Result<String, VcsError> {
        tracing::debug!("git {}", args.join(" "));
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.root)
            .output()
            .map_err(|source| VcsError::Spawn { source })?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            Err(VcsError::Command {
                args: args.join(" "),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

impl Vcs for GitCli {
    fn clone_shallow(&self, url: &str, branch: &str, dest: &Path) -> Result<(), VcsError> {
        let dest = dest.to_string_lossy();
        let branch_arg = format!("--branch={branch}");
        self.git(&["clone", "--depth=1", &branch_arg, "--", url, &dest])?;
        Ok(())
    }

    fn current_branch(&self) -> Result<String, VcsError> {
        let branch = self.git(&["rev-parse", "--abbrev-ref", "HEAD"])?;
        if branch == "HEAD" {
            return Err(VcsError::Command {
                args: "rev-parse --abbrev-ref HEAD".to_string(),
                stderr: "HEAD is detached".to_string(),
            });
        }
        Ok(branch)
    }

    fn checkout(&self, branch: &str) -> Result<(), VcsError> {
        self.git(&["checkout", branch, "--"])?;
        Ok(())
    }

    fn create_branch(&self, branch: &str) -> Result<(), VcsError> {
        self.git(&["checkout", "-b", branch])?;
        Ok(())
    }

    fn has_changes(&self, pathspec: &str) -> Result<bool, VcsError> {
        let status = self.git(&["status", "--porcelain", "--", pathspec])?;
        Ok(!status.is_empty())
    }

    fn add(&self, pathspec: &str) -> Result<(), VcsError> {
        self.git(&["add", "-A", "--", pathspec])?;
        Ok(())
    }

    fn commit(&self, message: &str) -> Result<(), VcsError> {
        self.git(&["commit", "-m", message])?;
        Ok(())
    }

    fn push(&self, branch: &str, force: bool) -> Result<(), VcsError> {
        if force {
            self.git(&["push", "--force", "origin", branch])?;
        } else {
            self.git(&["push", "origin", branch])?;
        }
        Ok(())
    }
}

/// Check out `branch`, creating it from HEAD if it does not exist yet.
pub fn checkout_or_create(vcs: &dyn Vcs, branch: &str) -> Result<(), VcsError> {
    match vcs.checkout(branch) {
        Ok(()) => {
            tracing::info!("switched to branch '{branch}'");
            Ok(())
        }
        Err(err) => {
            tracing::info!("branch '{branch}' not found ({err}); creating it");
            vcs.create_branch(branch)
        }
    }
}

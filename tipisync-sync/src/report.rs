//! What a run did: the classified change set plus everything that happened
//! while applying and publishing it.

use std::path::PathBuf;

use serde::Serialize;

use tipisync_core::PackageName;
use tipisync_engine::{ChangeSet, SyncDecision};

/// A package operation that failed. The run carried on without it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MutationFailure {
    pub name: PackageName,
    pub message: String,
}

/// Result of the commit/push step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PublishOutcome {
    /// Dry run, `--no-publish`, or a command that never publishes.
    NotRequested,
    /// Publishing was requested but the tree had nothing to commit.
    NothingToCommit,
    /// Committed locally, not pushed.
    Committed { message: String },
    Pushed { branch: String, message: String },
    /// Commit or push failed; local changes stay in place.
    Failed {
        branch: String,
        error: String,
        /// Command the operator can run to finish the push by hand.
        retry_hint: String,
    },
}

impl PublishOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, PublishOutcome::Failed { .. })
    }
}

/// Full outcome of `sync`, `filter`, `mirror` or `setup-custom`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Classification of every package; empty for runs that only remove.
    pub changes: ChangeSet,
    /// Local packages deleted by the run.
    pub removed: Vec<PackageName>,
    /// Local packages deliberately left untouched (filter / setup-custom).
    pub kept: Vec<PackageName>,
    /// Custom apps listed in the policy but not present locally.
    pub missing: Vec<PackageName>,
    pub failures: Vec<MutationFailure>,
    pub publish: PublishOutcome,
    /// Where the changelog was written, if it was.
    pub changelog: Option<PathBuf>,
    /// Why the changelog could not be rendered or written.
    pub changelog_error: Option<String>,
    pub dry_run: bool,
}

impl RunReport {
    pub fn new(changes: ChangeSet, dry_run: bool) -> Self {
        RunReport {
            changes,
            removed: Vec::new(),
            kept: Vec::new(),
            missing: Vec::new(),
            failures: Vec::new(),
            publish: PublishOutcome::NotRequested,
            changelog: None,
            changelog_error: None,
            dry_run,
        }
    }

    /// True when any package was (or in a dry run, would be) added, updated
    /// or removed.
    pub fn has_changes(&self) -> bool {
        self.changes.has_changes() || !self.removed.is_empty()
    }

    pub fn failed(&self, name: &PackageName) -> bool {
        self.failures.iter().any(|f| &f.name == name)
    }

    /// Turn every Add or Update whose install failed into a conflict, so the
    /// change set only counts packages that actually landed.
    pub fn demote_failed_installs(&mut self) {
        if self.failures.is_empty() {
            return;
        }
        let changes: ChangeSet = self
            .changes
            .iter()
            .map(|(name, decision)| {
                let decision = if decision.mutates_local() && self.failed(name) {
                    SyncDecision::Conflict {
                        reason: "not applied: upstream copy failed".to_string(),
                    }
                } else {
                    decision.clone()
                };
                (name.clone(), decision)
            })
            .collect();
        self.changes = changes;
    }
}

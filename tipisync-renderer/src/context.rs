//! Rendering payloads built from a [`ChangeSet`] and run metadata.

use chrono::{DateTime, Utc};
use serde::Serialize;

use tipisync_core::PackageName;
use tipisync_engine::{Bucket, ChangeSet};

/// Package name plus the text shown next to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryCtx {
    pub name: String,
    pub reason: String,
}

/// Run metadata shown in the changelog header.
#[derive(Debug, Clone)]
pub struct ChangelogMeta {
    pub title: String,
    pub date: DateTime<Utc>,
    pub upstream_url: String,
    pub branch: String,
}

/// Payload for `changelog.md.tera`.
#[derive(Debug, Clone, Serialize)]
pub struct ChangelogContext {
    pub title: String,
    pub date: String,
    pub upstream_url: String,
    pub branch: String,
    pub added: Vec<String>,
    pub updated: Vec<EntryCtx>,
    pub removed: Vec<String>,
    pub preserved: Vec<EntryCtx>,
    pub conflicts: Vec<EntryCtx>,
    pub failures: Vec<EntryCtx>,
    pub skipped_count: usize,
    /// Added + updated + removed.
    pub total_changes: usize,
}

impl ChangelogContext {
    /// Build the context for a classified run.
    pub fn from_changes(changes: &ChangeSet, meta: ChangelogMeta) -> Self {
        let entries = |bucket: Bucket| -> Vec<EntryCtx> {
            changes
                .in_bucket(bucket)
                .map(|(name, decision)| EntryCtx {
                    name: name.to_string(),
                    reason: decision.reason().unwrap_or_default().to_string(),
                })
                .collect()
        };
        let added: Vec<String> = changes
            .names_in(Bucket::Added)
            .into_iter()
            .map(ToString::to_string)
            .collect();
        let updated = entries(Bucket::Updated);
        let total_changes = added.len() + updated.len();

        ChangelogContext {
            title: meta.title,
            date: meta.date.to_rfc3339(),
            upstream_url: meta.upstream_url,
            branch: meta.branch,
            added,
            updated,
            removed: Vec::new(),
            preserved: entries(Bucket::Preserved),
            conflicts: entries(Bucket::Conflicted),
            failures: Vec::new(),
            skipped_count: changes.counts().skipped,
            total_changes,
        }
    }

    /// Record packages removed outside the change set (filter / mirror runs).
    pub fn with_removed<'a>(mut self, removed: impl IntoIterator<Item = &'a PackageName>) -> Self {
        self.removed = removed.into_iter().map(ToString::to_string).collect();
        self.total_changes = self.added.len() + self.updated.len() + self.removed.len();
        self
    }

    /// Record operations that failed while applying the change set.
    pub fn with_failures(mut self, failures: Vec<EntryCtx>) -> Self {
        self.failures = failures;
        self
    }

    /// Convert to a [`tera::Context`] for rendering.
    pub fn to_tera_context(&self) -> Result<tera::Context, tera::Error> {
        tera::Context::from_serialize(self)
    }
}

/// Payload for commit message templates.
#[derive(Debug, Clone, Serialize)]
pub struct CommitContext {
    /// `YYYY-MM-DD`.
    pub day: String,
    pub removed_count: usize,
    pub custom_app_count: usize,
}

impl CommitContext {
    pub fn on(date: DateTime<Utc>) -> Self {
        CommitContext {
            day: date.format("%Y-%m-%d").to_string(),
            removed_count: 0,
            custom_app_count: 0,
        }
    }
}

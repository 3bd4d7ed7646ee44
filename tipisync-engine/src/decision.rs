//! Per-package sync classification.
//!
//! Precedence:
//! 1. `Skip`: not in sync scope
//! 2. `Preserve`: custom package (when the policy preserves custom apps)
//! 3. `Conflict`: included but absent upstream
//! 4. `Conflict`: either descriptor unreadable
//! 5. `Add`: absent locally
//! 6. version, then revision comparison

use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;

use tipisync_core::{PackageDescriptor, PackagePair, PackageState, SyncPolicy};

use crate::inclusion::is_included;
use crate::version::compare_versions;

/// The single action chosen for a package. `reason` is for reporting only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum SyncDecision {
    Add,
    Update { reason: String },
    Preserve { reason: String },
    Skip { reason: String },
    Conflict { reason: String },
}

impl SyncDecision {
    pub fn bucket(&self) -> Bucket {
        match self {
            SyncDecision::Add => Bucket::Added,
            SyncDecision::Update { .. } => Bucket::Updated,
            SyncDecision::Preserve { .. } => Bucket::Preserved,
            SyncDecision::Skip { .. } => Bucket::Skipped,
            SyncDecision::Conflict { .. } => Bucket::Conflicted,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            SyncDecision::Add => None,
            SyncDecision::Update { reason }
            | SyncDecision::Preserve { reason }
            | SyncDecision::Skip { reason }
            | SyncDecision::Conflict { reason } => Some(reason),
        }
    }

    /// Add and Update replace local package contents.
    pub fn mutates_local(&self) -> bool {
        matches!(self, SyncDecision::Add | SyncDecision::Update { .. })
    }

    fn update(reason: impl Into<String>) -> Self {
        SyncDecision::Update { reason: reason.into() }
    }

    fn preserve(reason: impl Into<String>) -> Self {
        SyncDecision::Preserve { reason: reason.into() }
    }

    fn skip(reason: impl Into<String>) -> Self {
        SyncDecision::Skip { reason: reason.into() }
    }

    fn conflict(reason: impl Into<String>) -> Self {
        SyncDecision::Conflict { reason: reason.into() }
    }
}

/// Decision kind without its reason, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    Added,
    Updated,
    Preserved,
    Skipped,
    Conflicted,
}

impl Bucket {
    /// All buckets in a stable order.
    pub fn all() -> &'static [Bucket] {
        &[
            Bucket::Added,
            Bucket::Updated,
            Bucket::Preserved,
            Bucket::Skipped,
            Bucket::Conflicted,
        ]
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bucket::Added => write!(f, "added"),
            Bucket::Updated => write!(f, "updated"),
            Bucket::Preserved => write!(f, "preserved"),
            Bucket::Skipped => write!(f, "skipped"),
            Bucket::Conflicted => write!(f, "conflicted"),
        }
    }
}

/// Classify one package pair. Pure: no I/O, same inputs give the same output.
pub fn classify(pair: &PackagePair, policy: &SyncPolicy) -> SyncDecision {
    if !is_included(&pair.name, policy) {
        return SyncDecision::skip("not in sync scope");
    }
    if policy.preserve_custom_apps && policy.is_custom(&pair.name) {
        return SyncDecision::preserve("custom package");
    }
    match (&pair.local, &pair.upstream) {
        (_, PackageState::Absent) => SyncDecision::conflict("included but absent upstream"),
        (PackageState::Unreadable { .. }, _) | (_, PackageState::Unreadable { .. }) => {
            SyncDecision::conflict("descriptor unreadable")
        }
        (PackageState::Absent, PackageState::Present(_)) => SyncDecision::Add,
        (PackageState::Present(local), PackageState::Present(upstream)) => {
            compare_descriptors(local, upstream, policy)
        }
    }
}

fn compare_descriptors(
    local: &PackageDescriptor,
    upstream: &PackageDescriptor,
    policy: &SyncPolicy,
) -> SyncDecision {
    match compare_versions(&local.version, &upstream.version) {
        Ordering::Equal => {
            if local.revision < upstream.revision {
                SyncDecision::update(format!(
                    "revision bump: {} → {}",
                    local.revision, upstream.revision
                ))
            } else {
                SyncDecision::preserve("already up to date")
            }
        }
        Ordering::Greater => {
            // Only this branch checks the gap; equal versions with a higher
            // local revision fall into "already up to date".
            let rules = policy.version_rules;
            let gap = i64::from(upstream.revision) - i64::from(local.revision);
            if rules.require_comparable_revision && gap > rules.max_revision_gap {
                SyncDecision::preserve("local newer but revision gap exceeds limit")
            } else {
                SyncDecision::preserve("local version newer")
            }
        }
        Ordering::Less => SyncDecision::update(format!(
            "version update: {} → {}",
            local.version, upstream.version
        )),
    }
}

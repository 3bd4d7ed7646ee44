//! Change set aggregation.
//!
//! A [`ChangeSet`] is folded from `(name, decision)` results; it is never
//! pushed into incrementally by callers. Entries are alphabetical by name
//! and each name appears once, so the five buckets partition the package
//! universe.

use std::collections::BTreeMap;

use serde::Serialize;

use tipisync_core::{PackageName, PackagePair, SyncPolicy};

use crate::decision::{classify, Bucket, SyncDecision};

/// Final, ordered classification of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    entries: Vec<(PackageName, SyncDecision)>,
}

/// Number of packages in each bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BucketCounts {
    pub added: usize,
    pub updated: usize,
    pub preserved: usize,
    pub skipped: usize,
    pub conflicted: usize,
}

impl BucketCounts {
    pub fn get(&self, bucket: Bucket) -> usize {
        match bucket {
            Bucket::Added => self.added,
            Bucket::Updated => self.updated,
            Bucket::Preserved => self.preserved,
            Bucket::Skipped => self.skipped,
            Bucket::Conflicted => self.conflicted,
        }
    }

    pub fn total(&self) -> usize {
        self.added + self.updated + self.preserved + self.skipped + self.conflicted
    }
}

/// A conflict entry for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConflictEntry {
    pub name: PackageName,
    pub reason: String,
}

impl ChangeSet {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(PackageName, SyncDecision)> {
        self.entries.iter()
    }

    pub fn decision(&self, name: &PackageName) -> Option<&SyncDecision> {
        self.entries
            .binary_search_by(|(n, _)| n.cmp(name))
            .ok()
            .map(|i| &self.entries[i].1)
    }

    /// Entries in `bucket`, alphabetical.
    pub fn in_bucket(&self, bucket: Bucket) -> impl Iterator<Item = &(PackageName, SyncDecision)> {
        self.entries
            .iter()
            .filter(move |(_, decision)| decision.bucket() == bucket)
    }

    /// Names in `bucket`, alphabetical.
    pub fn names_in(&self, bucket: Bucket) -> Vec<&PackageName> {
        self.in_bucket(bucket).map(|(name, _)| name).collect()
    }

    pub fn counts(&self) -> BucketCounts {
        let mut counts = BucketCounts::default();
        for (_, decision) in &self.entries {
            match decision.bucket() {
                Bucket::Added => counts.added += 1,
                Bucket::Updated => counts.updated += 1,
                Bucket::Preserved => counts.preserved += 1,
                Bucket::Skipped => counts.skipped += 1,
                Bucket::Conflicted => counts.conflicted += 1,
            }
        }
        counts
    }

    /// Conflicts with their reasons, alphabetical.
    pub fn conflicts(&self) -> Vec<ConflictEntry> {
        self.in_bucket(Bucket::Conflicted)
            .map(|(name, decision)| ConflictEntry {
                name: name.clone(),
                reason: decision.reason().unwrap_or_default().to_string(),
            })
            .collect()
    }

    /// Whether applying this set would change local packages.
    pub fn has_changes(&self) -> bool {
        self.entries.iter().any(|(_, d)| d.mutates_local())
    }
}

impl FromIterator<(PackageName, SyncDecision)> for ChangeSet {
    /// Order of the input does not matter. A repeated name keeps its first
    /// decision.
    fn from_iter<I: IntoIterator<Item = (PackageName, SyncDecision)>>(iter: I) -> Self {
        let mut by_name: BTreeMap<PackageName, SyncDecision> = BTreeMap::new();
        for (name, decision) in iter {
            if by_name.contains_key(&name) {
                tracing::warn!("duplicate classification for '{name}' ignored");
                continue;
            }
            by_name.insert(name, decision);
        }
        ChangeSet {
            entries: by_name.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a ChangeSet {
    type Item = &'a (PackageName, SyncDecision);
    type IntoIter = std::slice::Iter<'a, (PackageName, SyncDecision)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Classify every pair and fold the results into a [`ChangeSet`].
pub fn classify_all<'a, I>(pairs: I, policy: &SyncPolicy) -> ChangeSet
where
    I: IntoIterator<Item = &'a PackagePair>,
{
    pairs
        .into_iter()
        .map(|pair| {
            let decision = classify(pair, policy);
            tracing::debug!("{}: {:?}", pair.name, decision);
            (pair.name.clone(), decision)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[(&str, SyncDecision)]) -> ChangeSet {
        items
            .iter()
            .map(|(n, d)| (PackageName::from(*n), d.clone()))
            .collect()
    }

    #[test]
    fn entries_sorted_regardless_of_input_order() {
        let cs = set(&[
            ("zigbee", SyncDecision::Add),
            ("adguard", SyncDecision::Skip { reason: "x".into() }),
        ]);
        let names: Vec<_> = cs.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["adguard", "zigbee"]);
    }

    #[test]
    fn duplicate_keeps_first() {
        let cs = set(&[
            ("gitea", SyncDecision::Add),
            ("gitea", SyncDecision::Skip { reason: "late".into() }),
        ]);
        assert_eq!(cs.len(), 1);
        assert_eq!(cs.decision(&"gitea".into()), Some(&SyncDecision::Add));
    }

    #[test]
    fn counts_and_conflicts() {
        let cs = set(&[
            ("a", SyncDecision::Add),
            ("b", SyncDecision::Conflict { reason: "descriptor unreadable".into() }),
            ("c", SyncDecision::Preserve { reason: "custom package".into() }),
            ("d", SyncDecision::Conflict { reason: "included but absent upstream".into() }),
        ]);
        let counts = cs.counts();
        assert_eq!(counts.added, 1);
        assert_eq!(counts.conflicted, 2);
        assert_eq!(counts.total(), 4);
        let conflicts = cs.conflicts();
        assert_eq!(conflicts[0].name.as_str(), "b");
        assert_eq!(conflicts[1].reason, "included but absent upstream");
        assert!(cs.has_changes());
    }

    #[test]
    fn empty_set_has_no_changes() {
        let cs = ChangeSet::default();
        assert!(cs.is_empty());
        assert!(!cs.has_changes());
        assert_eq!(cs.counts(), BucketCounts::default());
    }
}

//! Domain types for upstream app synchronization.
//!
//! Snapshots and policies are read once per run and never mutated afterwards;
//! everything here is a plain value.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed app package name (the package's directory name).
///
/// Ordering is plain string ordering, so ordered collections of names are
/// alphabetical.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageName(pub String);

impl PackageName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for PackageName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for PackageName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// Which list decides whether a non-custom upstream app participates in sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    Allowlist,
    Blocklist,
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncMode::Allowlist => write!(f, "allowlist"),
            SyncMode::Blocklist => write!(f, "blocklist"),
        }
    }
}

/// Rules applied when the local app version is newer than upstream's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VersionRules {
    pub require_comparable_revision: bool,
    pub max_revision_gap: i64,
}

/// Validated sync policy. Immutable for the duration of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPolicy {
    pub sync_mode: SyncMode,
    pub allowlist: BTreeSet<PackageName>,
    pub blocklist: BTreeSet<PackageName>,
    pub custom_apps: BTreeSet<PackageName>,
    pub version_rules: VersionRules,
    /// Custom apps are kept as-is instead of being compared against upstream.
    pub preserve_custom_apps: bool,
}

impl SyncPolicy {
    /// An empty policy in the given mode: no listed apps, default rules.
    pub fn new(sync_mode: SyncMode) -> Self {
        Self {
            sync_mode,
            allowlist: BTreeSet::new(),
            blocklist: BTreeSet::new(),
            custom_apps: BTreeSet::new(),
            version_rules: VersionRules::default(),
            preserve_custom_apps: true,
        }
    }

    pub fn is_custom(&self, name: &PackageName) -> bool {
        self.custom_apps.contains(name)
    }
}

/// Where upstream packages come from. Missing fields take the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamSource {
    pub url: String,
    pub branch: String,
}

impl Default for UpstreamSource {
    fn default() -> Self {
        Self {
            url: "https://github.com/runtipi/runtipi-appstore.git".to_string(),
            branch: "master".to_string(),
        }
    }
}

/// Branch names used by the mirror / custom-branch workflows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Branches {
    pub upstream: String,
    pub custom: String,
    pub main: String,
}

impl Default for Branches {
    fn default() -> Self {
        Self {
            upstream: "upstream".to_string(),
            custom: "custom".to_string(),
            main: "main".to_string(),
        }
    }
}

/// Everything loaded from the policy document: the decision policy plus the
/// repository settings the orchestration needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    pub upstream: UpstreamSource,
    pub branches: Branches,
    pub policy: SyncPolicy,
}

// ---------------------------------------------------------------------------
// Packages
// ---------------------------------------------------------------------------

/// Parsed `config.json` of a single app package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDescriptor {
    pub id: String,
    pub version: String,
    /// Secondary counter for descriptor-only updates (`tipi_version`).
    #[serde(rename = "tipi_version")]
    pub revision: u32,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
}

/// What one side of a snapshot knows about a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageState {
    /// No package directory on this side.
    Absent,
    Present(PackageDescriptor),
    /// The directory exists but its descriptor could not be read.
    Unreadable { reason: String },
}

impl PackageState {
    pub fn is_absent(&self) -> bool {
        matches!(self, PackageState::Absent)
    }

    pub fn descriptor(&self) -> Option<&PackageDescriptor> {
        match self {
            PackageState::Present(d) => Some(d),
            _ => None,
        }
    }
}

/// Local and upstream state of one package name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagePair {
    pub name: PackageName,
    pub local: PackageState,
    pub upstream: PackageState,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

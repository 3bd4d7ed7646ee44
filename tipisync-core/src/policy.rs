//! Policy document loading.
//!
//! The document lives at `<root>/.runtipi-sync/config.json`. Loading is two
//! steps: serde parses the raw [`PolicyDocument`], then [`validate`] turns it
//! into a fully-populated [`SyncConfig`]. Nothing partially parsed ever
//! reaches the decision engine.

use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigLoadError;
use crate::paths;
use crate::types::{
    Branches, PackageName, SyncConfig, SyncMode, SyncPolicy, UpstreamSource, VersionRules,
};

// ---------------------------------------------------------------------------
// Raw document
// ---------------------------------------------------------------------------

/// On-disk shape of the policy document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyDocument {
    #[serde(default)]
    pub upstream: UpstreamSource,
    #[serde(default)]
    pub branches: Branches,
    pub sync_mode: SyncMode,
    #[serde(default)]
    pub allowlist: Vec<String>,
    #[serde(default)]
    pub blocklist: Vec<String>,
    #[serde(default)]
    pub custom_apps: Vec<String>,
    #[serde(default = "default_true")]
    pub preserve_custom_apps: bool,
    #[serde(default)]
    pub version_comparison_rules: VersionComparisonRules,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionComparisonRules {
    #[serde(default = "default_true")]
    pub keep_if_newer_app_version: bool,
    #[serde(default)]
    pub require_comparable_tipi_version: bool,
    #[serde(default)]
    pub tipi_version_max_gap: i64,
}

impl Default for VersionComparisonRules {
    fn default() -> Self {
        Self {
            keep_if_newer_app_version: true,
            require_comparable_tipi_version: false,
            tipi_version_max_gap: 0,
        }
    }
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

/// Load and validate the policy for the repository at `root`.
pub fn load_at(root: &Path) -> Result<SyncConfig, ConfigLoadError> {
    load_from(&paths::policy_path(root))
}

/// Load and validate a policy document at an explicit path.
pub fn load_from(path: &Path) -> Result<SyncConfig, ConfigLoadError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(ConfigLoadError::NotFound {
                path: path.to_path_buf(),
            })
        }
        Err(e) => {
            return Err(ConfigLoadError::Io {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };
    let doc: PolicyDocument =
        serde_json::from_str(&contents).map_err(|e| ConfigLoadError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
    let config = validate(doc, path)?;
    tracing::debug!(
        "loaded policy from {} ({} mode, {} custom apps)",
        path.display(),
        config.policy.sync_mode,
        config.policy.custom_apps.len()
    );
    Ok(config)
}

/// Check a parsed document and build the typed config.
pub fn validate(doc: PolicyDocument, path: &Path) -> Result<SyncConfig, ConfigLoadError> {
    let invalid = |message: String| ConfigLoadError::Invalid {
        path: path.to_path_buf(),
        message,
    };

    let rules = &doc.version_comparison_rules;
    if rules.tipi_version_max_gap < 0 {
        return Err(invalid(format!(
            "tipiVersionMaxGap must be >= 0, got {}",
            rules.tipi_version_max_gap
        )));
    }
    if !rules.keep_if_newer_app_version {
        tracing::warn!(
            "keepIfNewerAppVersion=false is not supported; apps with a newer local version are kept"
        );
    }
    if doc.upstream.url.trim().is_empty() || doc.upstream.branch.trim().is_empty() {
        return Err(invalid("upstream url and branch must not be empty".to_string()));
    }

    let allowlist = name_set("allowlist", &doc.allowlist).map_err(invalid)?;
    let blocklist = name_set("blocklist", &doc.blocklist).map_err(invalid)?;
    let custom_apps = name_set("customApps", &doc.custom_apps).map_err(invalid)?;

    if doc.sync_mode == SyncMode::Allowlist && allowlist.is_empty() {
        tracing::warn!("allowlist mode with an empty allowlist: only custom apps are in scope");
    }

    Ok(SyncConfig {
        upstream: doc.upstream,
        branches: doc.branches,
        policy: SyncPolicy {
            sync_mode: doc.sync_mode,
            allowlist,
            blocklist,
            custom_apps,
            version_rules: VersionRules {
                require_comparable_revision: rules.require_comparable_tipi_version,
                max_revision_gap: rules.tipi_version_max_gap,
            },
            preserve_custom_apps: doc.preserve_custom_apps,
        },
    })
}

/// App names become directory names, so reject anything that could escape
/// the apps directory.
fn name_set(field: &str, names: &[String]) -> Result<BTreeSet<PackageName>, String> {
    let mut set = BTreeSet::new();
    for name in names {
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(format!("{field} contains an invalid app name: {name:?}"));
        }
        if !set.insert(PackageName::from(name.as_str())) {
            tracing::debug!("{field} lists '{name}' more than once");
        }
    }
    Ok(set)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

//! Package enumeration and snapshot pairing.
//!
//! A snapshot is taken once per side per run. Ordering everywhere is
//! alphabetical by package name so reports are reproducible.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::descriptor;
use crate::error::InventoryError;
use crate::types::{PackageName, PackagePair, PackageState};

/// Descriptor state of every package on one side, keyed by name.
pub type Snapshot = BTreeMap<PackageName, PackageState>;

/// Entries in an apps directory that are never packages.
const IGNORED_NAMES: &[&str] = &[".DS_Store", "__MACOSX"];

/// Whether a directory entry name can be a package.
pub fn is_package_name(name: &str) -> bool {
    !name.starts_with('.') && !IGNORED_NAMES.contains(&name) && !name.ends_with(".common.yml")
}

/// List package directory names under `apps_dir`, sorted.
///
/// Returns an empty list if `apps_dir` does not exist. Non-directories and
/// shared definition files are skipped.
pub fn list_packages_at(apps_dir: &Path) -> Result<Vec<PackageName>, InventoryError> {
    if !apps_dir.exists() {
        return Ok(vec![]);
    }
    let inv_err = |e| InventoryError {
        path: apps_dir.to_path_buf(),
        source: e,
    };
    let mut names: Vec<PackageName> = std::fs::read_dir(apps_dir)
        .map_err(inv_err)?
        .filter_map(|entry| readable_or_warn(apps_dir, entry))
        .filter(|e| readable_or_warn(apps_dir, e.file_type()).is_some_and(|t| t.is_dir()))
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| is_package_name(name))
        .map(PackageName::from)
        .collect();
    names.sort();
    Ok(names)
}

/// Unwrap a per-entry listing result; a failure drops the entry with a
/// warning instead of failing the whole listing.
fn readable_or_warn<T>(apps_dir: &Path, entry: std::io::Result<T>) -> Option<T> {
    match entry {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("skipping unreadable entry in {}: {e}", apps_dir.display());
            None
        }
    }
}

/// Read the descriptor of every package under `apps_dir`.
///
/// Unreadable descriptors are recorded per package, never returned as errors.
pub fn load_snapshot_at(apps_dir: &Path) -> Result<Snapshot, InventoryError> {
    let snapshot = list_packages_at(apps_dir)?
        .into_iter()
        .map(|name| {
            let state = descriptor::state_at(&apps_dir.join(name.as_str()));
            (name, state)
        })
        .collect();
    Ok(snapshot)
}

/// One pair per name in the union of both snapshots, alphabetical.
pub fn pair_snapshots(local: &Snapshot, upstream: &Snapshot) -> Vec<PackagePair> {
    let names: BTreeSet<&PackageName> = local.keys().chain(upstream.keys()).collect();
    names
        .into_iter()
        .map(|name| PackagePair {
            name: name.clone(),
            local: local.get(name).cloned().unwrap_or(PackageState::Absent),
            upstream: upstream.get(name).cloned().unwrap_or(PackageState::Absent),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    use crate::types::PackageDescriptor;

    fn present(version: &str) -> PackageState {
        PackageState::Present(PackageDescriptor {
            id: "x".into(),
            version: version.into(),
            revision: 1,
            updated_at: Utc.timestamp_millis_opt(0).unwrap(),
        })
    }

    #[test]
    fn ignores_hidden_and_common_files() {
        assert!(is_package_name("gitea"));
        assert!(!is_package_name(".DS_Store"));
        assert!(!is_package_name(".git"));
        assert!(!is_package_name("docker-compose.common.yml"));
    }

    #[test]
    fn unreadable_entry_is_dropped_not_fatal() {
        let dir = Path::new("/repo/apps");
        let failed: std::io::Result<u8> =
            Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"));
        assert_eq!(readable_or_warn(dir, failed), None);
        assert_eq!(readable_or_warn(dir, Ok(7u8)), Some(7));
    }

    #[test]
    fn missing_apps_dir_is_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        let names = list_packages_at(&dir.path().join("apps")).expect("list");
        assert!(names.is_empty());
    }

    #[test]
    fn pairs_cover_union_in_order() {
        let mut local = Snapshot::new();
        local.insert("b".into(), present("1.0"));
        local.insert("c".into(), present("1.0"));
        let mut upstream = Snapshot::new();
        upstream.insert("a".into(), present("1.0"));
        upstream.insert("b".into(), present("2.0"));

        let pairs = pair_snapshots(&local, &upstream);
        let names: Vec<_> = pairs.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["a", "b", "c"]);
        assert!(pairs[0].local.is_absent());
        assert!(pairs[2].upstream.is_absent());
        assert_eq!(pairs[1].upstream, present("2.0"));
    }
}

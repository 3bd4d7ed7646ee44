//! Workspace layout. Every path is derived from an explicit repository root.

use std::path::{Path, PathBuf};

pub const SYNC_DIR: &str = ".runtipi-sync";
pub const POLICY_FILE: &str = "config.json";
pub const APPS_DIR: &str = "apps";
pub const DESCRIPTOR_FILE: &str = "config.json";
pub const CHANGELOG_FILE: &str = "SYNC_CHANGELOG.md";

pub fn sync_dir(root: &Path) -> PathBuf {
    root.join(SYNC_DIR)
}

pub fn policy_path(root: &Path) -> PathBuf {
    sync_dir(root).join(POLICY_FILE)
}

pub fn apps_dir(root: &Path) -> PathBuf {
    root.join(APPS_DIR)
}

pub fn temp_dir(root: &Path) -> PathBuf {
    sync_dir(root).join("temp")
}

/// Destination of the shallow upstream clone.
pub fn upstream_clone_dir(root: &Path) -> PathBuf {
    temp_dir(root).join("upstream")
}

/// Where a replacement package is assembled before it is swapped in.
pub fn staging_dir(root: &Path) -> PathBuf {
    temp_dir(root).join("staging")
}

/// Apps directory inside an upstream checkout.
pub fn upstream_apps_dir(checkout: &Path) -> PathBuf {
    checkout.join(APPS_DIR)
}

pub fn changelog_path(root: &Path) -> PathBuf {
    sync_dir(root).join(CHANGELOG_FILE)
}

pub fn templates_dir(root: &Path) -> PathBuf {
    sync_dir(root).join("templates")
}

pub fn descriptor_path(package_dir: &Path) -> PathBuf {
    package_dir.join(DESCRIPTOR_FILE)
}

//! Package descriptor (`<app>/config.json`) reading.

use std::path::Path;

use crate::error::DescriptorReadError;
use crate::paths;
use crate::types::{PackageDescriptor, PackageState};

/// Read the descriptor of the package directory at `package_dir`.
pub fn read_at(package_dir: &Path) -> Result<PackageDescriptor, DescriptorReadError> {
    let path = paths::descriptor_path(package_dir);
    let contents = std::fs::read_to_string(&path).map_err(|e| DescriptorReadError::Io {
        path: path.clone(),
        source: e,
    })?;
    serde_json::from_str(&contents).map_err(|e| DescriptorReadError::Parse { path, source: e })
}

/// Snapshot state of an existing package directory.
///
/// A read failure is logged once and folded into [`PackageState::Unreadable`];
/// it never aborts the caller.
pub fn state_at(package_dir: &Path) -> PackageState {
    match read_at(package_dir) {
        Ok(descriptor) => PackageState::Present(descriptor),
        Err(err) => {
            tracing::warn!("{err}");
            PackageState::Unreadable {
                reason: err.to_string(),
            }
        }
    }
}

//! Package directory mutation seam.
//!
//! Applying a decision means copying or removing a whole package directory.
//! The pipeline goes through [`PackageMutator`] so tests can inject failures.

use std::io;
use std::path::Path;

/// Copies and removes package directories.
pub trait PackageMutator {
    /// Recursively copy `src` to `dest`. `dest` must not exist yet.
    fn copy_package(&self, src: &Path, dest: &Path) -> io::Result<()>;
    /// Recursively remove `path`. Removing a missing path is not an error.
    fn remove_package(&self, path: &Path) -> io::Result<()>;
    /// Move a fully copied package from `from` to `to`. `to` must not exist.
    fn move_package(&self, from: &Path, to: &Path) -> io::Result<()>;
}

/// [`PackageMutator`] over the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsMutator;

impl PackageMutator for FsMutator {
    fn copy_package(&self, src: &Path, dest: &Path) -> io::Result<()> {
        copy_dir_recursive(src, dest)
    }

    fn remove_package(&self, path: &Path) -> io::Result<()> {
        match std::fs::remove_dir_all(path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }

    fn move_package(&self, from: &Path, to: &Path) -> io::Result<()> {
        if let Some(parent) = to.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::rename(from, to)
    }
}

fn copy_dir_recursive(src: &Path, dest: &Path) -> io::Result<()> {
    std::fs::create_dir_all(dest)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let from = entry.path();
        let to = dest.join(entry.file_name());
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            copy_dir_recursive(&from, &to)?;
        } else if file_type.is_file() {
            std::fs::copy(&from, &to)?;
        } else {
            tracing::debug!("skipping non-regular entry {}", from.display());
        }
    }
    Ok(())
}

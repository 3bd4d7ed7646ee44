//! Unified diff of one package between the local tree and upstream.

use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use similar::TextDiff;

use tipisync_core::{inventory, paths, PackageName};

use crate::error::{io_err, SyncError};

/// A single file diff, keyed by path relative to the package directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    pub path: PathBuf,
    pub unified_diff: String,
}

/// Every differing text file of one package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDiff {
    pub name: PackageName,
    pub diffs: Vec<FileDiff>,
    /// Files that differ but are not UTF-8.
    pub binary: Vec<PathBuf>,
}

impl PackageDiff {
    pub fn is_empty(&self) -> bool {
        self.diffs.is_empty() && self.binary.is_empty()
    }
}

/// Compare `local_apps/<name>` against `upstream_apps/<name>`.
///
/// A file present on one side only is diffed against empty content. Fails
/// with [`SyncError::UnknownPackage`] when neither side has the package.
pub fn diff_package(
    name: &PackageName,
    local_apps: &Path,
    upstream_apps: &Path,
) -> Result<PackageDiff, SyncError> {
    let unknown = || SyncError::UnknownPackage {
        name: name.to_string(),
    };
    if !inventory::is_package_name(name.as_str()) || name.as_str().contains(['/', '\\']) {
        return Err(unknown());
    }
    let local_dir = local_apps.join(name.as_str());
    let upstream_dir = upstream_apps.join(name.as_str());
    if !local_dir.is_dir() && !upstream_dir.is_dir() {
        return Err(unknown());
    }

    let mut files = BTreeSet::new();
    collect_relative_files(&local_dir, &local_dir, &mut files)?;
    collect_relative_files(&upstream_dir, &upstream_dir, &mut files)?;

    let mut diffs = Vec::new();
    let mut binary = Vec::new();
    for rel in files {
        let old = read_or_empty(&local_dir.join(&rel))?;
        let new = read_or_empty(&upstream_dir.join(&rel))?;
        if old == new {
            continue;
        }
        let (Ok(old), Ok(new)) = (String::from_utf8(old), String::from_utf8(new)) else {
            binary.push(rel);
            continue;
        };
        let old = normalize_line_endings(&old);
        let new = normalize_line_endings(&new);
        if old == new {
            continue;
        }

        let shown = Path::new(paths::APPS_DIR).join(name.as_str()).join(&rel);
        let old_header = format!("a/{}", shown.display());
        let new_header = format!("b/{}", shown.display());
        let unified = TextDiff::from_lines(&old, &new)
            .unified_diff()
            .header(&old_header, &new_header)
            .context_radius(3)
            .to_string();
        diffs.push(FileDiff {
            path: rel,
            unified_diff: unified,
        });
    }

    Ok(PackageDiff {
        name: name.clone(),
        diffs,
        binary,
    })
}

fn collect_relative_files(
    base: &Path,
    dir: &Path,
    out: &mut BTreeSet<PathBuf>,
) -> Result<(), SyncError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(io_err(dir, e)),
    };
    for entry in entries {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| io_err(&path, e))?;
        if file_type.is_dir() {
            collect_relative_files(base, &path, out)?;
        } else if file_type.is_file() {
            if let Ok(rel) = path.strip_prefix(base) {
                out.insert(rel.to_path_buf());
            }
        }
    }
    Ok(())
}

fn read_or_empty(path: &Path) -> Result<Vec<u8>, SyncError> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(bytes),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(Vec::new()),
        Err(err) => Err(io_err(path, err)),
    }
}

fn normalize_line_endings(content: &str) -> String {
    content.replace("\r\n", "\n")
}

//! Obtaining the upstream snapshot.
//!
//! Either a fresh shallow clone into `.runtipi-sync/temp/upstream`, whose
//! whole `temp` directory is removed again when the [`UpstreamCheckout`] is
//! dropped, or an existing checkout supplied by the caller, which is never
//! deleted.

use std::path::{Path, PathBuf};

use tipisync_core::{inventory, paths, Snapshot, UpstreamSource};

use crate::error::{io_err, SyncError};
use crate::vcs::Vcs;

/// A directory holding upstream's `apps/` tree.
#[derive(Debug)]
pub struct UpstreamCheckout {
    dir: PathBuf,
    /// Scratch directory removed on drop; `None` for borrowed checkouts.
    cleanup: Option<PathBuf>,
}

impl UpstreamCheckout {
    /// Shallow-clone `source` below `root`. Any leftover clone from an
    /// earlier run is removed first.
    pub fn fetch(root: &Path, source: &UpstreamSource, vcs: &dyn Vcs) -> Result<Self, SyncError> {
        let dest = paths::upstream_clone_dir(root);
        if dest.exists() {
            tracing::debug!("removing stale upstream clone at {}", dest.display());
            std::fs::remove_dir_all(&dest).map_err(|e| io_err(&dest, e))?;
        }
        let parent = paths::temp_dir(root);
        std::fs::create_dir_all(&parent).map_err(|e| io_err(&parent, e))?;

        tracing::info!("cloning {} ({})", source.url, source.branch);
        vcs.clone_shallow(&source.url, &source.branch, &dest)
            .map_err(|e| SyncError::UpstreamFetch {
                reason: format!("cannot clone {}: {e}", source.url),
            })?;

        // Owned from here on so a failed check below still cleans up.
        let checkout = UpstreamCheckout {
            dir: dest,
            cleanup: Some(parent),
        };
        checkout.ensure_apps_dir()?;
        Ok(checkout)
    }

    /// Use a checkout that already exists on disk.
    pub fn existing(dir: impl Into<PathBuf>) -> Result<Self, SyncError> {
        let checkout = UpstreamCheckout {
            dir: dir.into(),
            cleanup: None,
        };
        checkout.ensure_apps_dir()?;
        Ok(checkout)
    }

    /// Fetch a fresh clone unless `existing` names a checkout to reuse.
    pub fn resolve(
        root: &Path,
        source: &UpstreamSource,
        vcs: &dyn Vcs,
        existing: Option<&Path>,
    ) -> Result<Self, SyncError> {
        match existing {
            Some(dir) => UpstreamCheckout::existing(dir),
            None => UpstreamCheckout::fetch(root, source, vcs),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn apps_dir(&self) -> PathBuf {
        paths::upstream_apps_dir(&self.dir)
    }

    pub fn package_dir(&self, name: &str) -> PathBuf {
        self.apps_dir().join(name)
    }

    /// Read every upstream package descriptor.
    pub fn snapshot(&self) -> Result<Snapshot, SyncError> {
        inventory::load_snapshot_at(&self.apps_dir()).map_err(|e| SyncError::UpstreamFetch {
            reason: e.to_string(),
        })
    }

    fn ensure_apps_dir(&self) -> Result<(), SyncError> {
        let apps = self.apps_dir();
        if apps.is_dir() {
            Ok(())
        } else {
            Err(SyncError::UpstreamFetch {
                reason: format!("upstream has no apps directory at {}", apps.display()),
            })
        }
    }
}

impl Drop for UpstreamCheckout {
    fn drop(&mut self) {
        let Some(scratch) = &self.cleanup else {
            return;
        };
        if let Err(e) = std::fs::remove_dir_all(scratch) {
            tracing::warn!("could not clean up {}: {e}", scratch.display());
        } else {
            tracing::debug!("cleaned up {}", scratch.display());
        }
    }
}

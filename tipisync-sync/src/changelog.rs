//! Changelog persistence.

use std::path::{Path, PathBuf};

use chrono::Utc;

use tipisync_core::{paths, SyncConfig};
use tipisync_renderer::{ChangelogContext, ChangelogMeta, EntryCtx, Renderer};

use crate::error::{io_err, SyncError};
use crate::report::RunReport;

pub const SYNC_TITLE: &str = "Upstream Sync Changes";
pub const MIRROR_TITLE: &str = "Upstream Mirror Changes";

/// Render the changelog for `report`.
pub fn render(
    renderer: &Renderer,
    config: &SyncConfig,
    report: &RunReport,
    title: &str,
    branch: &str,
) -> Result<String, SyncError> {
    let meta = ChangelogMeta {
        title: title.to_string(),
        date: Utc::now(),
        upstream_url: config.upstream.url.clone(),
        branch: branch.to_string(),
    };
    let failures = report
        .failures
        .iter()
        .map(|f| EntryCtx {
            name: f.name.to_string(),
            reason: f.message.clone(),
        })
        .collect();
    let ctx = ChangelogContext::from_changes(&report.changes, meta)
        .with_removed(&report.removed)
        .with_failures(failures);
    Ok(renderer.changelog(&ctx)?)
}

/// Write `content` to `.runtipi-sync/SYNC_CHANGELOG.md` via a temp file and
/// rename, so a reader never sees a half-written changelog.
pub fn write_at(root: &Path, content: &str) -> Result<PathBuf, SyncError> {
    let path = paths::changelog_path(root);
    let tmp = path.with_extension("md.tmp");
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    std::fs::write(&tmp, content).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, &path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(&path, e));
    }
    tracing::info!("wrote changelog: {}", path.display());
    Ok(path)
}

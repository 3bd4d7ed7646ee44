//! Error types for tipisync-sync.

use std::path::PathBuf;

use thiserror::Error;

use tipisync_core::{ConfigLoadError, InventoryError};
use tipisync_renderer::RenderError;

use crate::vcs::VcsError;

/// Errors that stop a run.
///
/// Per-package mutation failures and publish failures are not errors at this
/// level; they are captured in the [`RunReport`](crate::report::RunReport).
#[derive(Debug, Error)]
pub enum SyncError {
    /// The policy document is missing or invalid.
    #[error(transparent)]
    Config(#[from] ConfigLoadError),

    /// The upstream snapshot could not be obtained. Raised before any local
    /// package is touched.
    #[error("upstream fetch failed: {reason}")]
    UpstreamFetch { reason: String },

    /// An apps directory could not be listed.
    #[error(transparent)]
    Inventory(#[from] InventoryError),

    /// A version-control step that the run cannot continue without.
    #[error("git error: {0}")]
    Vcs(#[from] VcsError),

    /// An error from the rendering engine.
    #[error("render error: {0}")]
    Render(#[from] RenderError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The named package does not exist on either side.
    #[error("unknown app '{name}'")]
    UnknownPackage { name: String },
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}

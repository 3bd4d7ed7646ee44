//! Error types for tipisync-core.

use std::path::PathBuf;

use thiserror::Error;

/// The policy document could not be turned into a usable [`SyncConfig`].
///
/// Always fatal: a run never starts mutating packages without a policy.
///
/// [`SyncConfig`]: crate::types::SyncConfig
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    /// The policy document does not exist.
    #[error("sync policy not found at {path}")]
    NotFound { path: PathBuf },

    /// Underlying I/O failure while reading the document.
    #[error("failed to read sync policy at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON parse or schema error; serde_json supplies line/column context.
    #[error("failed to parse sync policy at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The document parsed but holds values the engine cannot work with.
    #[error("invalid sync policy at {path}: {message}")]
    Invalid { path: PathBuf, message: String },
}

/// A single package's `config.json` is missing or malformed.
///
/// Recoverable: the package degrades to a conflict and the run continues.
#[derive(Debug, Error)]
pub enum DescriptorReadError {
    #[error("cannot read descriptor {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed descriptor {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// An apps directory could not be listed.
#[derive(Debug, Error)]
#[error("cannot list packages in {path}: {source}")]
pub struct InventoryError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

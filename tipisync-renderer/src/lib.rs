//! # tipisync-renderer
//!
//! Tera-based rendering of the sync changelog and commit messages from a
//! classified [`ChangeSet`](tipisync_engine::ChangeSet).
//!
//! ## Usage
//!
//! ```rust,no_run
//! use chrono::Utc;
//! use tipisync_engine::ChangeSet;
//! use tipisync_renderer::{ChangelogContext, ChangelogMeta, Renderer};
//!
//! fn write_changelog(changes: &ChangeSet) {
//!     let meta = ChangelogMeta {
//!         title: "Upstream Sync Changes".into(),
//!         date: Utc::now(),
//!         upstream_url: "https://github.com/runtipi/runtipi-appstore.git".into(),
//!         branch: "main".into(),
//!     };
//!     if let Ok(renderer) = Renderer::new() {
//!         if let Ok(text) = renderer.changelog(&ChangelogContext::from_changes(changes, meta)) {
//!             println!("{text}");
//!         }
//!     }
//! }
//! ```

pub mod context;
pub mod engine;
pub mod error;

pub use context::{ChangelogContext, ChangelogMeta, CommitContext, EntryCtx};
pub use engine::{DocumentKind, Renderer, TemplateEngine};
pub use error::RenderError;

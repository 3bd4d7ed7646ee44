//! Tera rendering engine: [`DocumentKind`] enum and [`Renderer`].
//!
//! | Document           | Template                    |
//! |--------------------|-----------------------------|
//! | Changelog          | `changelog.md.tera`         |
//! | Sync commit        | `commit/sync.tera`          |
//! | Filter commit      | `commit/filter.tera`        |
//! | Custom branch init | `commit/custom_branch.tera` |
//!
//! Any of these can be overridden by a file with the same relative name in
//! the user template directory (`.runtipi-sync/templates/`).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tera::Tera;

use crate::context::{ChangelogContext, CommitContext};
use crate::error::RenderError;

// ---------------------------------------------------------------------------
// Embedded templates: baked into the binary at compile time via include_str!
// ---------------------------------------------------------------------------

const TPLS: &[(&str, &str)] = &[
    ("changelog.md.tera", include_str!("templates/changelog.md.tera")),
    ("commit/sync.tera", include_str!("templates/commit/sync.tera")),
    ("commit/filter.tera", include_str!("templates/commit/filter.tera")),
    (
        "commit/custom_branch.tera",
        include_str!("templates/commit/custom_branch.tera"),
    ),
];

// ---------------------------------------------------------------------------
// Template loading helpers
// ---------------------------------------------------------------------------

fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> RenderError {
    RenderError::Io { path: path.into(), source }
}

fn normalize_template_name(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "/")
        .to_lowercase()
}

fn collect_template_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), RenderError> {
    let entries = std::fs::read_dir(dir).map_err(|e| io_err(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let path = entry.path();
        let meta = entry.metadata().map_err(|e| io_err(&path, e))?;
        if meta.is_dir() {
            collect_template_files(&path, out)?;
        } else if meta.is_file() {
            out.push(path);
        }
    }
    Ok(())
}

fn load_user_templates(dir: &Path) -> Result<Vec<(String, String)>, RenderError> {
    if !dir.exists() {
        return Ok(vec![]);
    }
    let mut files = Vec::new();
    collect_template_files(dir, &mut files)?;
    let mut templates = Vec::new();
    for path in files {
        if path.extension().and_then(|s| s.to_str()) != Some("tera") {
            continue;
        }
        let rel = path.strip_prefix(dir).unwrap_or(path.as_path());
        let name = normalize_template_name(rel);
        let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        templates.push((name, contents));
    }
    Ok(templates)
}

fn build_tera(user_template_dir: Option<&Path>) -> Result<Tera, RenderError> {
    let mut templates: HashMap<String, String> = HashMap::new();
    for (name, content) in TPLS {
        templates.insert(
            normalize_template_name(Path::new(name)),
            (*content).to_string(),
        );
    }
    if let Some(dir) = user_template_dir {
        for (name, content) in load_user_templates(dir)? {
            templates.insert(name, content);
        }
    }

    let mut tera = Tera::default();
    let items: Vec<(String, String)> = templates.into_iter().collect();
    tera.add_raw_templates(items)?;
    Ok(tera)
}

// ---------------------------------------------------------------------------
// DocumentKind
// ---------------------------------------------------------------------------

/// Every document the sync tool renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    Changelog,
    SyncCommit,
    FilterCommit,
    CustomBranchCommit,
}

impl DocumentKind {
    /// All document kinds in a stable order.
    pub fn all() -> &'static [DocumentKind] {
        &[
            DocumentKind::Changelog,
            DocumentKind::SyncCommit,
            DocumentKind::FilterCommit,
            DocumentKind::CustomBranchCommit,
        ]
    }

    pub fn template_name(&self) -> &'static str {
        match self {
            DocumentKind::Changelog => "changelog.md.tera",
            DocumentKind::SyncCommit => "commit/sync.tera",
            DocumentKind::FilterCommit => "commit/filter.tera",
            DocumentKind::CustomBranchCommit => "commit/custom_branch.tera",
        }
    }

    pub fn is_commit_message(&self) -> bool {
        !matches!(self, DocumentKind::Changelog)
    }
}

// ---------------------------------------------------------------------------
// TemplateEngine
// ---------------------------------------------------------------------------

/// Tera-based engine for rendering templates with optional user overrides.
///
/// `user_template_dir` may contain `.tera` files that override embedded defaults.
/// Template names are normalised to lowercase and relative paths.
pub struct TemplateEngine {
    tera: Tera,
}

impl TemplateEngine {
    /// Construct a new [`TemplateEngine`], loading embedded templates plus any
    /// overrides found in `user_template_dir`.
    pub fn new(user_template_dir: Option<&Path>) -> Result<Self, RenderError> {
        let tera = build_tera(user_template_dir)?;
        Ok(TemplateEngine { tera })
    }

    /// Render `kind` with any serializable context.
    ///
    /// Commit messages are trimmed to a single trailing-whitespace-free string.
    pub fn render<T: Serialize>(&self, kind: DocumentKind, ctx: &T) -> Result<String, RenderError> {
        let tera_ctx = tera::Context::from_serialize(ctx)?;
        let rendered = self.tera.render(kind.template_name(), &tera_ctx)?;
        if kind.is_commit_message() {
            return Ok(rendered.trim().to_string());
        }
        Ok(rendered)
    }
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// Typed front end over [`TemplateEngine`]. Create once and reuse.
pub struct Renderer {
    engine: TemplateEngine,
}

impl Renderer {
    /// Construct a new [`Renderer`] with embedded templates.
    pub fn new() -> Result<Self, RenderError> {
        Ok(Renderer { engine: TemplateEngine::new(None)? })
    }

    /// Construct a [`Renderer`] that prefers templates found in `dir`.
    pub fn with_overrides(dir: &Path) -> Result<Self, RenderError> {
        Ok(Renderer { engine: TemplateEngine::new(Some(dir))? })
    }

    pub fn changelog(&self, ctx: &ChangelogContext) -> Result<String, RenderError> {
        self.engine.render(DocumentKind::Changelog, ctx)
    }

    /// Render a commit message. `kind` must be one of the commit kinds.
    pub fn commit_message(
        &self,
        kind: DocumentKind,
        ctx: &CommitContext,
    ) -> Result<String, RenderError> {
        debug_assert!(kind.is_commit_message(), "{kind:?} is not a commit message");
        self.engine.render(kind, ctx)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

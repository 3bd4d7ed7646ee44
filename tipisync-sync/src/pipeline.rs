//! Run orchestration shared by every `tipisync` command.
//!
//! Each entry point loads the policy, obtains whatever snapshots it needs,
//! and only then starts touching `apps/`. Fatal errors therefore always
//! surface before the first mutation. Once `apps/` has been touched nothing
//! aborts the run: per-package, changelog and publish failures are recorded
//! in the [`RunReport`].

use std::path::{Path, PathBuf};

use chrono::Utc;

use tipisync_core::{inventory, paths, policy, PackageName, PackageState, SyncConfig};
use tipisync_engine::{classify_all, is_included, ChangeSet, SyncDecision};
use tipisync_renderer::{CommitContext, DocumentKind, Renderer};

use crate::changelog;
use crate::diff::{diff_package, PackageDiff};
use crate::error::SyncError;
use crate::mutate::PackageMutator;
use crate::report::{MutationFailure, PublishOutcome, RunReport};
use crate::upstream::UpstreamCheckout;
use crate::vcs::{checkout_or_create, Vcs, VcsError};

/// Pathspec staged by `sync`, `filter` and `mirror`.
const APPS_PATHSPEC: &str = paths::APPS_DIR;
/// `setup-custom` stages the whole tree.
const ALL_PATHSPEC: &str = ".";

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Repository root plus the collaborators a run acts through.
#[derive(Clone, Copy)]
pub struct SyncEnv<'a> {
    pub root: &'a Path,
    pub vcs: &'a dyn Vcs,
    pub mutator: &'a dyn PackageMutator,
}

impl<'a> SyncEnv<'a> {
    pub fn new(root: &'a Path, vcs: &'a dyn Vcs, mutator: &'a dyn PackageMutator) -> Self {
        SyncEnv { root, vcs, mutator }
    }

    fn apps_dir(&self) -> PathBuf {
        paths::apps_dir(self.root)
    }

    fn renderer(&self) -> Result<Renderer, SyncError> {
        Ok(Renderer::with_overrides(&paths::templates_dir(self.root))?)
    }
}

/// Flags shared by the mutating commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Compute and report, but leave the tree and branches untouched.
    pub dry_run: bool,
    /// Commit (and, except for `filter`, push) once the tree is updated.
    pub publish: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            dry_run: false,
            publish: true,
        }
    }
}

/// Classification computed without applying it.
#[derive(Debug, Clone)]
pub struct Plan {
    pub config: SyncConfig,
    pub changes: ChangeSet,
}

// ---------------------------------------------------------------------------
// plan / diff
// ---------------------------------------------------------------------------

/// Classify every package against upstream. Nothing under `apps/` changes.
///
/// `upstream` reuses an existing checkout instead of cloning.
pub fn plan(env: SyncEnv<'_>, upstream: Option<&Path>) -> Result<Plan, SyncError> {
    let config = policy::load_at(env.root)?;
    let checkout = UpstreamCheckout::resolve(env.root, &config.upstream, env.vcs, upstream)?;
    let changes = classify(env, &config, &checkout)?;
    Ok(Plan { config, changes })
}

/// Unified diff of one package between `apps/` and upstream.
pub fn diff(
    env: SyncEnv<'_>,
    name: &PackageName,
    upstream: Option<&Path>,
) -> Result<PackageDiff, SyncError> {
    let config = policy::load_at(env.root)?;
    let checkout = UpstreamCheckout::resolve(env.root, &config.upstream, env.vcs, upstream)?;
    diff_package(name, &env.apps_dir(), &checkout.apps_dir())
}

fn classify(
    env: SyncEnv<'_>,
    config: &SyncConfig,
    checkout: &UpstreamCheckout,
) -> Result<ChangeSet, SyncError> {
    let local = inventory::load_snapshot_at(&env.apps_dir())?;
    let upstream = checkout.snapshot()?;
    let pairs = inventory::pair_snapshots(&local, &upstream);
    tracing::info!(
        "classifying {} packages ({} local, {} upstream)",
        pairs.len(),
        local.len(),
        upstream.len()
    );
    Ok(classify_all(&pairs, &config.policy))
}

// ---------------------------------------------------------------------------
// sync
// ---------------------------------------------------------------------------

/// Policy-driven sync of the current branch.
///
/// Applies every Add and Update, writes the changelog, then commits `apps/`
/// and pushes the current branch.
pub fn run_sync(env: SyncEnv<'_>, opts: RunOptions) -> Result<RunReport, SyncError> {
    let config = policy::load_at(env.root)?;
    let renderer = env.renderer()?;
    let checkout = UpstreamCheckout::fetch(env.root, &config.upstream, env.vcs)?;
    let changes = classify(env, &config, &checkout)?;

    let mut report = RunReport::new(changes, opts.dry_run);
    if opts.dry_run {
        log_dry_run(&report);
        return Ok(report);
    }

    let to_apply: Vec<(PackageName, SyncDecision)> = report
        .changes
        .iter()
        .filter(|(_, decision)| decision.mutates_local())
        .cloned()
        .collect();
    for (name, decision) in &to_apply {
        let replace = matches!(decision, SyncDecision::Update { .. });
        install_from_upstream(env, &checkout, name, replace, &mut report);
    }
    report.demote_failed_installs();

    let branch = env.vcs.current_branch();
    if let Err(e) = &branch {
        tracing::warn!("cannot determine current branch: {e}; the push will be skipped");
    }
    let label = branch.as_deref().unwrap_or("(unknown)");
    write_changelog(env, &renderer, &config, &mut report, changelog::SYNC_TITLE, label);

    if opts.publish {
        let ctx = CommitContext::on(Utc::now());
        let message = render_commit(&renderer, DocumentKind::SyncCommit, &ctx, APPS_PATHSPEC);
        report.publish = match (message, &branch) {
            (Err(outcome), _) => outcome,
            (Ok(message), Ok(branch)) => {
                publish(env.vcs, APPS_PATHSPEC, &message, Some((branch.as_str(), false)))
            }
            (Ok(message), Err(e)) => commit_unpushed(env.vcs, &message, e),
        };
    }
    Ok(report)
}

// ---------------------------------------------------------------------------
// filter
// ---------------------------------------------------------------------------

/// Remove every local package the policy does not include.
///
/// With `publish` the removals are committed on the current branch but not
/// pushed.
pub fn run_filter(env: SyncEnv<'_>, opts: RunOptions) -> Result<RunReport, SyncError> {
    let config = policy::load_at(env.root)?;
    let renderer = env.renderer()?;
    let local = inventory::list_packages_at(&env.apps_dir())?;
    tracing::info!(
        "filtering {} apps ({} mode, {} custom)",
        local.len(),
        config.policy.sync_mode,
        config.policy.custom_apps.len()
    );

    let mut report = RunReport::new(ChangeSet::default(), opts.dry_run);
    for name in local {
        if is_included(&name, &config.policy) {
            tracing::debug!("keep: {name}");
            report.kept.push(name);
        } else {
            remove_local(env, name, opts.dry_run, &mut report);
        }
    }

    if opts.dry_run {
        log_dry_run(&report);
    } else if opts.publish {
        let mut ctx = CommitContext::on(Utc::now());
        ctx.removed_count = report.removed.len();
        report.publish =
            match render_commit(&renderer, DocumentKind::FilterCommit, &ctx, APPS_PATHSPEC) {
                Ok(message) => publish(env.vcs, APPS_PATHSPEC, &message, None),
                Err(outcome) => outcome,
            };
    }
    Ok(report)
}

// ---------------------------------------------------------------------------
// mirror
// ---------------------------------------------------------------------------

/// Make the upstream branch an exact copy of upstream's apps and force-push
/// it.
///
/// Every upstream package is copied over its local counterpart. Packages
/// whose descriptor is unchanged are still refreshed but reported as
/// preserved, so only real upstream movement counts as a change. Local-only
/// packages are removed.
pub fn run_mirror(env: SyncEnv<'_>, opts: RunOptions) -> Result<RunReport, SyncError> {
    let config = policy::load_at(env.root)?;
    let renderer = env.renderer()?;
    let checkout = UpstreamCheckout::fetch(env.root, &config.upstream, env.vcs)?;
    let branch = config.branches.upstream.clone();

    if opts.dry_run {
        tracing::info!("[dry-run] comparing against the current branch instead of '{branch}'");
    } else {
        checkout_or_create(env.vcs, &branch)?;
    }

    let local = inventory::load_snapshot_at(&env.apps_dir())?;
    let upstream = checkout.snapshot()?;
    let changes: ChangeSet = upstream
        .iter()
        .map(|(name, up)| (name.clone(), mirror_decision(local.get(name), up)))
        .collect();
    let local_only: Vec<PackageName> = local
        .keys()
        .filter(|name| !upstream.contains_key(*name))
        .cloned()
        .collect();

    let mut report = RunReport::new(changes, opts.dry_run);
    for name in local_only {
        remove_local(env, name, opts.dry_run, &mut report);
    }
    if opts.dry_run {
        log_dry_run(&report);
        return Ok(report);
    }

    for name in upstream.keys() {
        install_from_upstream(env, &checkout, name, local.contains_key(name), &mut report);
    }
    report.demote_failed_installs();

    write_changelog(env, &renderer, &config, &mut report, changelog::MIRROR_TITLE, &branch);

    if opts.publish {
        let ctx = CommitContext::on(Utc::now());
        let push = Some((branch.as_str(), true));
        report.publish =
            match render_commit(&renderer, DocumentKind::SyncCommit, &ctx, APPS_PATHSPEC) {
                Ok(message) => publish(env.vcs, APPS_PATHSPEC, &message, push),
                Err(outcome) => outcome,
            };
    }
    Ok(report)
}

fn mirror_decision(local: Option<&PackageState>, upstream: &PackageState) -> SyncDecision {
    match (local, upstream) {
        (None, _) | (Some(PackageState::Absent), _) => SyncDecision::Add,
        (Some(PackageState::Present(l)), PackageState::Present(u)) if l == u => {
            SyncDecision::Preserve {
                reason: "descriptor unchanged upstream".to_string(),
            }
        }
        (Some(PackageState::Present(l)), PackageState::Present(u)) => SyncDecision::Update {
            reason: format!("replaced with upstream copy: {} → {}", l.version, u.version),
        },
        _ => SyncDecision::Update {
            reason: "replaced with upstream copy".to_string(),
        },
    }
}

// ---------------------------------------------------------------------------
// setup-custom
// ---------------------------------------------------------------------------

/// Build the custom branch from main: keep only the policy's custom apps,
/// commit the whole tree and force-push.
pub fn run_setup_custom(env: SyncEnv<'_>, opts: RunOptions) -> Result<RunReport, SyncError> {
    let config = policy::load_at(env.root)?;
    let renderer = env.renderer()?;
    let custom_apps = &config.policy.custom_apps;

    if opts.dry_run {
        tracing::info!("[dry-run] inspecting the current branch; no checkout");
    } else {
        env.vcs.checkout(&config.branches.main)?;
        tracing::info!("switched to '{}'", config.branches.main);
        checkout_or_create(env.vcs, &config.branches.custom)?;
    }

    let local = inventory::list_packages_at(&env.apps_dir())?;
    tracing::info!("found {} apps, {} custom", local.len(), custom_apps.len());

    let mut report = RunReport::new(ChangeSet::default(), opts.dry_run);
    report.missing = custom_apps
        .iter()
        .filter(|name| local.binary_search(*name).is_err())
        .cloned()
        .collect();
    for name in &report.missing {
        tracing::warn!("custom app '{name}' not found on '{}'", config.branches.main);
    }

    for name in local {
        if custom_apps.contains(&name) {
            report.kept.push(name);
        } else {
            remove_local(env, name, opts.dry_run, &mut report);
        }
    }

    if opts.dry_run {
        log_dry_run(&report);
    } else if opts.publish {
        let mut ctx = CommitContext::on(Utc::now());
        ctx.custom_app_count = custom_apps.len();
        let push = Some((config.branches.custom.as_str(), true));
        report.publish =
            match render_commit(&renderer, DocumentKind::CustomBranchCommit, &ctx, ALL_PATHSPEC) {
                Ok(message) => publish(env.vcs, ALL_PATHSPEC, &message, push),
                Err(outcome) => outcome,
            };
    }
    Ok(report)
}

// ---------------------------------------------------------------------------
// Shared steps
// ---------------------------------------------------------------------------

/// Why installing a package failed, and whether the local copy is gone.
struct InstallFailure {
    message: String,
    local_removed: bool,
}

impl InstallFailure {
    fn local_kept(message: String) -> Self {
        InstallFailure {
            message,
            local_removed: false,
        }
    }
}

/// Copy `name` from the checkout into `apps/`. Failures are recorded against
/// the package; a package whose old copy is lost is also reported removed.
fn install_from_upstream(
    env: SyncEnv<'_>,
    checkout: &UpstreamCheckout,
    name: &PackageName,
    replace: bool,
    report: &mut RunReport,
) {
    let src = checkout.package_dir(name.as_str());
    let dest = env.apps_dir().join(name.as_str());

    let result = if replace {
        replace_package(env, name, &src, &dest)
    } else {
        env.mutator.copy_package(&src, &dest).map_err(|e| {
            discard(env.mutator, &dest);
            InstallFailure::local_kept(format!("copy from upstream failed: {e}"))
        })
    };
    match result {
        Ok(()) => tracing::info!("{} {name}", if replace { "updated" } else { "added" }),
        Err(failure) => {
            tracing::warn!("failed to install {name}: {}", failure.message);
            if failure.local_removed {
                report.removed.push(name.clone());
            }
            report.failures.push(MutationFailure {
                name: name.clone(),
                message: failure.message,
            });
        }
    }
}

/// Assemble the new copy under the staging directory and swap it in only
/// once it is complete. A failed copy leaves the local package untouched.
fn replace_package(
    env: SyncEnv<'_>,
    name: &PackageName,
    src: &Path,
    dest: &Path,
) -> Result<(), InstallFailure> {
    let staged = paths::staging_dir(env.root).join(name.as_str());
    let copied = env
        .mutator
        .remove_package(&staged)
        .and_then(|()| env.mutator.copy_package(src, &staged));
    if let Err(e) = copied {
        discard(env.mutator, &staged);
        let message = format!("copy from upstream failed: {e}");
        return Err(InstallFailure::local_kept(message));
    }
    if let Err(e) = env.mutator.remove_package(dest) {
        discard(env.mutator, &staged);
        return Err(InstallFailure {
            message: format!("could not remove the old copy: {e}"),
            local_removed: !dest.exists(),
        });
    }
    env.mutator.move_package(&staged, dest).map_err(|e| {
        discard(env.mutator, &staged);
        InstallFailure {
            message: format!("old copy removed but the new one could not be moved in: {e}"),
            local_removed: true,
        }
    })
}

/// Best-effort removal of a partial copy.
fn discard(mutator: &dyn PackageMutator, path: &Path) {
    if let Err(e) = mutator.remove_package(path) {
        tracing::warn!("could not remove partial copy {}: {e}", path.display());
    }
}

/// Render and write the changelog. A failure is recorded, never returned.
fn write_changelog(
    env: SyncEnv<'_>,
    renderer: &Renderer,
    config: &SyncConfig,
    report: &mut RunReport,
    title: &str,
    branch: &str,
) {
    let written = changelog::render(renderer, config, report, title, branch)
        .and_then(|text| changelog::write_at(env.root, &text));
    match written {
        Ok(path) => report.changelog = Some(path),
        Err(e) => {
            tracing::warn!("changelog not written: {e}");
            report.changelog_error = Some(e.to_string());
        }
    }
}

/// Render a commit message, or the publish failure to report instead.
fn render_commit(
    renderer: &Renderer,
    kind: DocumentKind,
    ctx: &CommitContext,
    pathspec: &str,
) -> Result<String, PublishOutcome> {
    renderer.commit_message(kind, ctx).map_err(|e| {
        tracing::warn!("cannot render commit message: {e}");
        PublishOutcome::Failed {
            branch: String::new(),
            error: format!("cannot render commit message: {e}"),
            retry_hint: format!("git add -A -- {pathspec} && git commit"),
        }
    })
}

/// Commit `apps/` but leave the push to the operator when HEAD names no
/// branch.
fn commit_unpushed(vcs: &dyn Vcs, message: &str, reason: &VcsError) -> PublishOutcome {
    match publish(vcs, APPS_PATHSPEC, message, None) {
        PublishOutcome::Committed { .. } => {
            tracing::warn!("committed but not pushed: {reason}");
            PublishOutcome::Failed {
                branch: String::new(),
                error: format!("committed but not pushed: no current branch: {reason}"),
                retry_hint: "git push origin HEAD:<branch>".to_string(),
            }
        }
        other => other,
    }
}

/// Delete `apps/<name>`, or only record it in a dry run.
fn remove_local(env: SyncEnv<'_>, name: PackageName, dry_run: bool, report: &mut RunReport) {
    if dry_run {
        tracing::info!("[dry-run] would remove {name}");
        report.removed.push(name);
        return;
    }
    match env.mutator.remove_package(&env.apps_dir().join(name.as_str())) {
        Ok(()) => {
            tracing::info!("removed {name}");
            report.removed.push(name);
        }
        Err(e) => {
            tracing::warn!("failed to remove {name}: {e}");
            report.failures.push(MutationFailure {
                name,
                message: format!("remove failed: {e}"),
            });
        }
    }
}

/// Stage `pathspec`, commit, and optionally push `(branch, force)`.
///
/// Never fails the run: every problem becomes [`PublishOutcome::Failed`]
/// with the command to retry by hand.
fn publish(
    vcs: &dyn Vcs,
    pathspec: &str,
    message: &str,
    push: Option<(&str, bool)>,
) -> PublishOutcome {
    let target = push.map(|(branch, _)| branch.to_string()).unwrap_or_default();
    let failed = |error: String, retry_hint: String| {
        tracing::warn!("publish failed: {error}");
        PublishOutcome::Failed {
            branch: target.clone(),
            error,
            retry_hint,
        }
    };
    let commit_hint = || format!("git add -A -- {pathspec} && git commit -m \"{message}\"");

    match vcs.has_changes(pathspec) {
        Ok(false) => {
            tracing::info!("no changes to commit");
            return PublishOutcome::NothingToCommit;
        }
        Ok(true) => {}
        Err(e) => return failed(e.to_string(), commit_hint()),
    }
    if let Err(e) = vcs.add(pathspec).and_then(|()| vcs.commit(message)) {
        return failed(e.to_string(), commit_hint());
    }
    tracing::info!("committed: {message}");

    let Some((branch, force)) = push else {
        return PublishOutcome::Committed {
            message: message.to_string(),
        };
    };
    match vcs.push(branch, force) {
        Ok(()) => {
            tracing::info!("pushed {branch}");
            PublishOutcome::Pushed {
                branch: branch.to_string(),
                message: message.to_string(),
            }
        }
        Err(e) => {
            let flag = if force { " --force" } else { "" };
            failed(e.to_string(), format!("git push origin {branch}{flag}"))
        }
    }
}

fn log_dry_run(report: &RunReport) {
    let counts = report.changes.counts();
    tracing::info!(
        "[dry-run] {} to add, {} to update, {} to remove; nothing written",
        counts.added,
        counts.updated,
        report.removed.len()
    );
}

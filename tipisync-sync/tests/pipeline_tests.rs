//! End-to-end runs of every pipeline entry point against temp directories,
//! with a scripted VCS and an injectable mutator.

use std::cell::RefCell;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tipisync_core::PackageName;
use tipisync_engine::Bucket;
use tipisync_sync::{
    pipeline, FsMutator, PackageMutator, PublishOutcome, RunOptions, SyncEnv, SyncError, Vcs,
    VcsError,
};

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

/// Records every call; "clones" by copying a fixture directory.
struct FakeVcs {
    upstream_fixture: Option<PathBuf>,
    /// `None` behaves like a detached HEAD.
    current: Option<String>,
    existing_branches: Vec<String>,
    dirty: bool,
    fail_push: bool,
    calls: RefCell<Vec<String>>,
}

impl FakeVcs {
    fn new(upstream_fixture: Option<&Path>) -> Self {
        FakeVcs {
            upstream_fixture: upstream_fixture.map(Path::to_path_buf),
            current: Some("main".to_string()),
            existing_branches: vec!["main".to_string()],
            dirty: true,
            fail_push: false,
            calls: RefCell::new(Vec::new()),
        }
    }

    fn record(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }

    fn called(&self, prefix: &str) -> bool {
        self.calls.borrow().iter().any(|c| c.starts_with(prefix))
    }

    fn refused(args: &str) -> VcsError {
        VcsError::Command {
            args: args.to_string(),
            stderr: "fatal: scripted failure".to_string(),
        }
    }
}

impl Vcs for FakeVcs {
    fn clone_shallow(&self, url: &str, branch: &str, dest: &Path) -> Result<(), VcsError> {
        self.record(format!("clone {url} {branch}"));
        match &self.upstream_fixture {
            Some(src) => FsMutator
                .copy_package(src, dest)
                .map_err(|source| VcsError::Spawn { source }),
            None => Err(FakeVcs::refused("clone")),
        }
    }

    fn current_branch(&self) -> Result<String, VcsError> {
        self.current
            .clone()
            .ok_or_else(|| FakeVcs::refused("rev-parse"))
    }

    fn checkout(&self, branch: &str) -> Result<(), VcsError> {
        self.record(format!("checkout {branch}"));
        if self.existing_branches.iter().any(|b| b == branch) {
            Ok(())
        } else {
            Err(FakeVcs::refused("checkout"))
        }
    }

    fn create_branch(&self, branch: &str) -> Result<(), VcsError> {
        self.record(format!("create {branch}"));
        Ok(())
    }

    fn has_changes(&self, pathspec: &str) -> Result<bool, VcsError> {
        self.record(format!("status {pathspec}"));
        Ok(self.dirty)
    }

    fn add(&self, pathspec: &str) -> Result<(), VcsError> {
        self.record(format!("add {pathspec}"));
        Ok(())
    }

    fn commit(&self, message: &str) -> Result<(), VcsError> {
        self.record(format!("commit {message}"));
        Ok(())
    }

    fn push(&self, branch: &str, force: bool) -> Result<(), VcsError> {
        self.record(format!("push {branch} force={force}"));
        if self.fail_push {
            Err(FakeVcs::refused("push"))
        } else {
            Ok(())
        }
    }
}

/// Filesystem mutator that refuses to copy one named package.
struct FailingCopy {
    package: &'static str,
}

impl PackageMutator for FailingCopy {
    fn copy_package(&self, src: &Path, dest: &Path) -> io::Result<()> {
        if dest.ends_with(self.package) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"));
        }
        FsMutator.copy_package(src, dest)
    }

    fn remove_package(&self, path: &Path) -> io::Result<()> {
        FsMutator.remove_package(path)
    }

    fn move_package(&self, from: &Path, to: &Path) -> io::Result<()> {
        FsMutator.move_package(from, to)
    }
}

/// Filesystem mutator whose final swap into `apps/` always fails.
struct FailingMove;

impl PackageMutator for FailingMove {
    fn copy_package(&self, src: &Path, dest: &Path) -> io::Result<()> {
        FsMutator.copy_package(src, dest)
    }

    fn remove_package(&self, path: &Path) -> io::Result<()> {
        FsMutator.remove_package(path)
    }

    fn move_package(&self, _from: &Path, _to: &Path) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::Other, "cross-device link"))
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

struct Fixture {
    root: TempDir,
    upstream: TempDir,
}

impl Fixture {
    /// Blocklist policy with `my-app` custom. Local: gitea 1.0, my-app,
    /// old-app. Upstream: gitea 1.1, immich, old-app (unchanged).
    fn new(policy: &str) -> Self {
        let root = TempDir::new().expect("root");
        let upstream = TempDir::new().expect("upstream");
        write(&root.path().join(".runtipi-sync/config.json"), policy);

        let local_apps = root.path().join("apps");
        app(&local_apps, "gitea", "1.0.0", 1);
        app(&local_apps, "my-app", "0.1.0", 1);
        app(&local_apps, "old-app", "2.0.0", 4);

        let upstream_apps = upstream.path().join("apps");
        app(&upstream_apps, "gitea", "1.1.0", 2);
        app(&upstream_apps, "immich", "1.90.0", 7);
        app(&upstream_apps, "old-app", "2.0.0", 4);

        Fixture { root, upstream }
    }

    fn vcs(&self) -> FakeVcs {
        FakeVcs::new(Some(self.upstream.path()))
    }

    fn apps(&self) -> PathBuf {
        self.root.path().join("apps")
    }
}

const BLOCKLIST_POLICY: &str = r#"{ "syncMode": "blocklist", "customApps": ["my-app"] }"#;

fn write(path: &Path, content: &str) {
    std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    std::fs::write(path, content).expect("write");
}

fn app(apps: &Path, name: &str, version: &str, revision: u32) {
    write(
        &apps.join(name).join("config.json"),
        &format!(
            r#"{{"id":"{name}","version":"{version}","tipi_version":{revision},"updated_at":1700000000000}}"#
        ),
    );
}

fn names(list: &[PackageName]) -> Vec<&str> {
    list.iter().map(PackageName::as_str).collect()
}

fn version_of(apps: &Path, name: &str) -> String {
    std::fs::read_to_string(apps.join(name).join("config.json")).expect("descriptor")
}

// ---------------------------------------------------------------------------
// sync
// ---------------------------------------------------------------------------

#[test]
fn sync_applies_changes_writes_changelog_and_pushes() {
    let fx = Fixture::new(BLOCKLIST_POLICY);
    let vcs = fx.vcs();
    let env = SyncEnv::new(fx.root.path(), &vcs, &FsMutator);

    let report = pipeline::run_sync(env, RunOptions::default()).expect("sync");

    let changes = &report.changes;
    assert_eq!(names_in(changes, Bucket::Added), ["immich"]);
    assert_eq!(names_in(changes, Bucket::Updated), ["gitea"]);
    assert_eq!(names_in(changes, Bucket::Preserved), ["my-app", "old-app"]);
    assert!(report.failures.is_empty());
    assert!(report.has_changes());

    assert!(version_of(&fx.apps(), "gitea").contains("1.1.0"));
    assert!(fx.apps().join("immich/config.json").exists());
    assert!(fx.apps().join("my-app").exists(), "custom app untouched");

    let changelog = std::fs::read_to_string(report.changelog.as_ref().expect("changelog path"))
        .expect("read changelog");
    assert!(changelog.contains("- immich"));
    assert!(changelog.contains("**Branch:** main"));

    match &report.publish {
        PublishOutcome::Pushed { branch, message } => {
            assert_eq!(branch, "main");
            assert!(message.starts_with("chore: sync apps from upstream ("));
        }
        other => panic!("expected push, got {other:?}"),
    }
    assert!(vcs.called("add apps"));
    assert!(vcs.called("push main force=false"));
    assert!(
        !fx.root.path().join(".runtipi-sync/temp").exists(),
        "clone and staging area are removed after the run"
    );
}

fn names_in(changes: &tipisync_engine::ChangeSet, bucket: Bucket) -> Vec<&str> {
    changes
        .names_in(bucket)
        .into_iter()
        .map(PackageName::as_str)
        .collect()
}

#[test]
fn sync_dry_run_leaves_tree_untouched() {
    let fx = Fixture::new(BLOCKLIST_POLICY);
    let vcs = fx.vcs();
    let env = SyncEnv::new(fx.root.path(), &vcs, &FsMutator);
    let opts = RunOptions {
        dry_run: true,
        publish: true,
    };

    let report = pipeline::run_sync(env, opts).expect("sync");
    assert!(report.has_changes());
    assert!(!fx.apps().join("immich").exists());
    assert!(version_of(&fx.apps(), "gitea").contains("1.0.0"));
    assert!(report.changelog.is_none());
    assert_eq!(report.publish, PublishOutcome::NotRequested);
    assert!(!vcs.called("commit"));
}

#[test]
fn failed_clone_is_fatal_before_any_mutation() {
    let fx = Fixture::new(BLOCKLIST_POLICY);
    let vcs = FakeVcs::new(None);
    let env = SyncEnv::new(fx.root.path(), &vcs, &FsMutator);

    let err = pipeline::run_sync(env, RunOptions::default()).expect_err("clone fails");
    assert!(matches!(err, SyncError::UpstreamFetch { .. }), "got: {err}");
    assert!(version_of(&fx.apps(), "gitea").contains("1.0.0"));
    assert!(!fx.apps().join("immich").exists());
    assert!(!vcs.called("commit"));
}

#[test]
fn upstream_without_apps_dir_is_fatal() {
    let fx = Fixture::new(BLOCKLIST_POLICY);
    let empty = TempDir::new().expect("empty upstream");
    let vcs = FakeVcs::new(Some(empty.path()));
    let env = SyncEnv::new(fx.root.path(), &vcs, &FsMutator);

    let err = pipeline::run_sync(env, RunOptions::default()).expect_err("no apps dir");
    assert!(matches!(err, SyncError::UpstreamFetch { .. }), "got: {err}");
}

#[test]
fn mutation_failure_is_recorded_and_run_continues() {
    let fx = Fixture::new(BLOCKLIST_POLICY);
    let vcs = fx.vcs();
    let mutator = FailingCopy { package: "gitea" };
    let env = SyncEnv::new(fx.root.path(), &vcs, &mutator);

    let report = pipeline::run_sync(env, RunOptions::default()).expect("sync");
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].name.as_str(), "gitea");
    assert!(report.failures[0].message.contains("read-only"));
    assert!(
        fx.apps().join("immich/config.json").exists(),
        "later packages are still applied"
    );

    assert!(
        version_of(&fx.apps(), "gitea").contains("1.0.0"),
        "a failed update keeps the local copy"
    );
    assert!(report.removed.is_empty());
    assert!(names_in(&report.changes, Bucket::Updated).is_empty());
    assert_eq!(names_in(&report.changes, Bucket::Conflicted), ["gitea"]);
    assert_eq!(report.changes.counts().added, 1);

    let changelog =
        std::fs::read_to_string(report.changelog.as_ref().expect("changelog")).expect("read");
    assert!(changelog.contains("Failed Operations"));
    assert!(!changelog.contains("Updated Apps"));
    assert!(changelog.contains("Total changes: 1"));
}

#[test]
fn failed_swap_reports_package_removed() {
    let fx = Fixture::new(BLOCKLIST_POLICY);
    let vcs = fx.vcs();
    let env = SyncEnv::new(fx.root.path(), &vcs, &FailingMove);

    let report = pipeline::run_sync(env, RunOptions::default()).expect("sync");
    assert!(!fx.apps().join("gitea").exists());
    assert_eq!(names(&report.removed), ["gitea"]);
    assert!(report.failed(&PackageName::from("gitea")));
    assert!(report.failures[0].message.contains("cross-device link"));
    assert!(fx.apps().join("immich/config.json").exists(), "adds copy in place");
}

#[test]
fn changelog_failure_is_recorded_and_publish_still_runs() {
    let fx = Fixture::new(BLOCKLIST_POLICY);
    // A non-empty directory where the changelog file should go.
    std::fs::create_dir_all(fx.root.path().join(".runtipi-sync/SYNC_CHANGELOG.md/blocker"))
        .expect("mkdir");
    let vcs = fx.vcs();
    let env = SyncEnv::new(fx.root.path(), &vcs, &FsMutator);

    let report = pipeline::run_sync(env, RunOptions::default()).expect("sync completes");
    assert!(report.changelog.is_none());
    assert!(report.changelog_error.is_some());
    assert!(fx.apps().join("immich/config.json").exists());
    assert!(version_of(&fx.apps(), "gitea").contains("1.1.0"));
    assert!(vcs.called("commit"));
    assert!(matches!(report.publish, PublishOutcome::Pushed { .. }));
}

#[test]
fn unknown_branch_commits_but_skips_push() {
    let fx = Fixture::new(BLOCKLIST_POLICY);
    let mut vcs = fx.vcs();
    vcs.current = None;
    let env = SyncEnv::new(fx.root.path(), &vcs, &FsMutator);

    let report = pipeline::run_sync(env, RunOptions::default()).expect("sync");
    assert!(vcs.called("commit"));
    assert!(!vcs.called("push"), "never pushes to a guessed branch");
    match &report.publish {
        PublishOutcome::Failed {
            error, retry_hint, ..
        } => {
            assert!(error.contains("not pushed"));
            assert_eq!(retry_hint, "git push origin HEAD:<branch>");
        }
        other => panic!("expected failure, got {other:?}"),
    }
    let changelog =
        std::fs::read_to_string(report.changelog.as_ref().expect("changelog")).expect("read");
    assert!(changelog.contains("**Branch:** (unknown)"));
}

#[test]
fn push_failure_is_reported_with_retry_hint() {
    let fx = Fixture::new(BLOCKLIST_POLICY);
    let mut vcs = fx.vcs();
    vcs.fail_push = true;
    let env = SyncEnv::new(fx.root.path(), &vcs, &FsMutator);

    let report = pipeline::run_sync(env, RunOptions::default()).expect("sync still succeeds");
    match &report.publish {
        PublishOutcome::Failed { retry_hint, .. } => {
            assert_eq!(retry_hint, "git push origin main");
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(fx.apps().join("immich").exists(), "local changes stay applied");
}

#[test]
fn clean_tree_has_nothing_to_commit() {
    let fx = Fixture::new(BLOCKLIST_POLICY);
    let mut vcs = fx.vcs();
    vcs.dirty = false;
    let env = SyncEnv::new(fx.root.path(), &vcs, &FsMutator);

    let report = pipeline::run_sync(env, RunOptions::default()).expect("sync");
    assert_eq!(report.publish, PublishOutcome::NothingToCommit);
    assert!(!vcs.called("commit"));
}

#[test]
fn missing_policy_is_fatal() {
    let root = TempDir::new().expect("root");
    let vcs = FakeVcs::new(None);
    let env = SyncEnv::new(root.path(), &vcs, &FsMutator);
    let err = pipeline::run_sync(env, RunOptions::default()).expect_err("no policy");
    assert!(matches!(err, SyncError::Config(_)), "got: {err}");
    assert!(vcs.calls.borrow().is_empty(), "nothing runs without a policy");
}

// ---------------------------------------------------------------------------
// plan / diff
// ---------------------------------------------------------------------------

#[test]
fn plan_with_existing_checkout_does_not_clone() {
    let fx = Fixture::new(BLOCKLIST_POLICY);
    let vcs = FakeVcs::new(None);
    let env = SyncEnv::new(fx.root.path(), &vcs, &FsMutator);

    let plan = pipeline::plan(env, Some(fx.upstream.path())).expect("plan");
    assert_eq!(plan.changes.len(), 4);
    assert_eq!(plan.changes.counts().added, 1);
    assert!(!vcs.called("clone"));
    assert!(fx.upstream.path().join("apps").exists(), "borrowed checkout kept");
}

#[test]
fn diff_shows_descriptor_change() {
    let fx = Fixture::new(BLOCKLIST_POLICY);
    let vcs = FakeVcs::new(None);
    let env = SyncEnv::new(fx.root.path(), &vcs, &FsMutator);

    let diff = pipeline::diff(env, &PackageName::from("gitea"), Some(fx.upstream.path()))
        .expect("diff");
    assert_eq!(diff.diffs.len(), 1);
    assert!(diff.diffs[0].unified_diff.contains("1.1.0"));

    let same = pipeline::diff(env, &PackageName::from("old-app"), Some(fx.upstream.path()))
        .expect("diff");
    assert!(same.is_empty());
}

// ---------------------------------------------------------------------------
// filter
// ---------------------------------------------------------------------------

#[test]
fn filter_removes_packages_outside_scope_and_commits_only() {
    let fx = Fixture::new(
        r#"{ "syncMode": "allowlist", "allowlist": ["gitea"], "customApps": ["my-app"] }"#,
    );
    let vcs = FakeVcs::new(None);
    let env = SyncEnv::new(fx.root.path(), &vcs, &FsMutator);

    let report = pipeline::run_filter(env, RunOptions::default()).expect("filter");
    assert_eq!(names(&report.removed), ["old-app"]);
    assert_eq!(names(&report.kept), ["gitea", "my-app"]);
    assert!(!fx.apps().join("old-app").exists());
    assert!(matches!(report.publish, PublishOutcome::Committed { .. }));
    assert!(vcs.called("commit chore: filter apps by sync policy (1 removed)"));
    assert!(!vcs.called("push"));
}

#[test]
fn filter_with_nothing_to_remove_reports_no_changes() {
    let fx = Fixture::new(BLOCKLIST_POLICY);
    let vcs = FakeVcs::new(None);
    let env = SyncEnv::new(fx.root.path(), &vcs, &FsMutator);
    let opts = RunOptions {
        dry_run: false,
        publish: false,
    };

    let report = pipeline::run_filter(env, opts).expect("filter");
    assert!(report.removed.is_empty());
    assert!(!report.has_changes());
    assert_eq!(report.publish, PublishOutcome::NotRequested);
}

// ---------------------------------------------------------------------------
// mirror
// ---------------------------------------------------------------------------

#[test]
fn mirror_replaces_everything_and_force_pushes_upstream_branch() {
    let fx = Fixture::new(BLOCKLIST_POLICY);
    let vcs = fx.vcs();
    let env = SyncEnv::new(fx.root.path(), &vcs, &FsMutator);

    let report = pipeline::run_mirror(env, RunOptions::default()).expect("mirror");
    assert!(vcs.called("checkout upstream"));
    assert!(vcs.called("create upstream"), "missing branch is created");

    assert_eq!(names_in(&report.changes, Bucket::Added), ["immich"]);
    assert_eq!(names_in(&report.changes, Bucket::Updated), ["gitea"]);
    assert_eq!(names_in(&report.changes, Bucket::Preserved), ["old-app"]);
    assert_eq!(names(&report.removed), ["my-app"], "local-only apps go");
    assert!(!fx.apps().join("my-app").exists());
    assert!(version_of(&fx.apps(), "gitea").contains("1.1.0"));

    assert!(vcs.called("push upstream force=true"));
    let changelog =
        std::fs::read_to_string(report.changelog.as_ref().expect("changelog")).expect("read");
    assert!(changelog.starts_with("# Upstream Mirror Changes"));
    assert!(changelog.contains("## ❌ Removed Apps\n- my-app"));
}

#[test]
fn mirror_dry_run_does_not_switch_branches() {
    let fx = Fixture::new(BLOCKLIST_POLICY);
    let vcs = fx.vcs();
    let env = SyncEnv::new(fx.root.path(), &vcs, &FsMutator);
    let opts = RunOptions {
        dry_run: true,
        publish: true,
    };

    let report = pipeline::run_mirror(env, opts).expect("mirror");
    assert_eq!(names(&report.removed), ["my-app"]);
    assert!(fx.apps().join("my-app").exists());
    assert!(!vcs.called("checkout"));
    assert!(!vcs.called("push"));
}

// ---------------------------------------------------------------------------
// setup-custom
// ---------------------------------------------------------------------------

#[test]
fn setup_custom_keeps_only_custom_apps() {
    let fx = Fixture::new(
        r#"{ "syncMode": "blocklist", "customApps": ["my-app", "never-built"] }"#,
    );
    let vcs = FakeVcs::new(None);
    let env = SyncEnv::new(fx.root.path(), &vcs, &FsMutator);

    let report = pipeline::run_setup_custom(env, RunOptions::default()).expect("setup");
    assert!(vcs.called("checkout main"));
    assert!(vcs.called("create custom"));
    assert_eq!(names(&report.kept), ["my-app"]);
    assert_eq!(names(&report.removed), ["gitea", "old-app"]);
    assert_eq!(names(&report.missing), ["never-built"]);
    assert!(!fx.apps().join("gitea").exists());
    assert!(vcs.called("add ."));
    assert!(vcs.called("commit chore: initialize custom branch with 2 custom apps"));
    assert!(vcs.called("push custom force=true"));
}

#[test]
fn setup_custom_fails_when_main_cannot_be_checked_out() {
    let fx = Fixture::new(BLOCKLIST_POLICY);
    let mut vcs = FakeVcs::new(None);
    vcs.existing_branches.clear();
    let env = SyncEnv::new(fx.root.path(), &vcs, &FsMutator);

    let err = pipeline::run_setup_custom(env, RunOptions::default()).expect_err("no main");
    assert!(matches!(err, SyncError::Vcs(_)), "got: {err}");
    assert!(fx.apps().join("gitea").exists());
}

//! Sync scope: which package names upstream-driven sync may touch at all.

use tipisync_core::{PackageName, SyncMode, SyncPolicy};

/// Whether `name` participates in upstream-driven sync.
///
/// Custom apps are always in scope and bypass the allow/block lists.
pub fn is_included(name: &PackageName, policy: &SyncPolicy) -> bool {
    if policy.custom_apps.contains(name) {
        return true;
    }
    match policy.sync_mode {
        SyncMode::Allowlist => policy.allowlist.contains(name),
        SyncMode::Blocklist => !policy.blocklist.contains(name),
    }
}

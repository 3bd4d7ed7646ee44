//! # tipisync-engine
//!
//! The sync decision engine. Everything here is pure: given a policy and
//! local/upstream package descriptors it decides what a sync run would do,
//! without touching the filesystem.
//!
//! ```rust
//! use tipisync_core::{PackagePair, PackageState, SyncMode, SyncPolicy};
//! use tipisync_engine::{classify_all, Bucket};
//!
//! let policy = SyncPolicy::new(SyncMode::Blocklist);
//! let pairs = vec![PackagePair {
//!     name: "gitea".into(),
//!     local: PackageState::Present(tipisync_core::PackageDescriptor {
//!         id: "gitea".into(),
//!         version: "1.0.0".into(),
//!         revision: 1,
//!         updated_at: Default::default(),
//!     }),
//!     upstream: PackageState::Absent,
//! }];
//! let changes = classify_all(&pairs, &policy);
//! assert_eq!(changes.counts().get(Bucket::Conflicted), 1);
//! ```

pub mod changeset;
pub mod decision;
pub mod inclusion;
pub mod version;

pub use changeset::{classify_all, BucketCounts, ChangeSet, ConflictEntry};
pub use decision::{classify, Bucket, SyncDecision};
pub use inclusion::is_included;
pub use version::compare_versions;

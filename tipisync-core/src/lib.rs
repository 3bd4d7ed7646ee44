//! tipisync core library: domain types, policy and descriptor loading,
//! package enumeration, errors.
//!
//! - [`types`]: newtypes, policy, descriptors, snapshot pairs
//! - [`policy`]: policy document load / validate
//! - [`descriptor`]: per-package `config.json` reading
//! - [`inventory`]: apps directory listing and snapshot pairing
//! - [`paths`]: repository layout rooted at an explicit path

pub mod descriptor;
pub mod error;
pub mod inventory;
pub mod paths;
pub mod policy;
pub mod types;

pub use error::{ConfigLoadError, DescriptorReadError, InventoryError};
pub use inventory::Snapshot;
pub use types::{
    Branches, PackageDescriptor, PackageName, PackagePair, PackageState, SyncConfig, SyncMode,
    SyncPolicy, UpstreamSource, VersionRules,
};

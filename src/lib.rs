//! stackscope library crate.
//!
//! The primary interface is the `stackscope` binary. This lib.rs exposes the
//! pipeline so integration tests (and other tools) can drive it directly:
//! acquire two snapshots, diff them, resolve both stack sets, then scan and
//! enrich with `stackscope-core`.

pub mod affected;
pub mod config;
pub mod diff;
pub mod error;
pub mod output;
pub mod snapshot;
pub mod stacks;
pub mod telemetry;

pub use affected::{
    describe_affected, describe_affected_with_clone, describe_affected_with_repo_path,
    describe_component,
};
pub use config::StackscopeConfig;
pub use error::AffectedError;
pub use snapshot::{CloneRequest, Snapshot, SnapshotPair, SnapshotRole};

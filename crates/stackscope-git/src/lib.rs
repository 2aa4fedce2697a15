//! Git abstraction layer for stackscope.
//!
//! This crate defines the [`GitRepo`] trait, the single interface through
//! which the rest of stackscope reads repository snapshots. No other
//! stackscope crate imports gix directly; they depend on `stackscope-git` and
//! program against the trait.
//!
//! # Crate layout
//!
//! - [`repo`]: the [`GitRepo`] trait definition.
//! - [`types`]: value types used in trait signatures ([`GitOid`], [`RefName`],
//!   [`TreeEntry`], [`DiffEntry`], [`CloneOptions`], etc.).
//! - [`error`]: the [`GitError`] enum returned by all trait methods.
//! - [`tree_diff`]: file-level diff of two trees that may live in different
//!   repositories.

pub mod error;
pub mod repo;
pub mod tree_diff;
pub mod types;

// gix-backed implementation modules
mod checkout_impl;
mod clone_impl;
mod config_impl;
mod gix_repo;
mod objects_impl;
mod progress;
mod refs_impl;

pub use gix_repo::GixRepo;

// Re-export the main trait and commonly used types at the crate root for
// ergonomic imports: `use stackscope_git::{GitRepo, GitOid, GitError};`
pub use error::GitError;
pub use repo::GitRepo;
pub use tree_diff::diff_trees_across;
pub use types::{
    ChangeType, CloneOptions, DiffEntry, EntryMode, GitOid, OidParseError, RefName,
    RefNameError, RemoteInfo, SshAuth, TreeEntry,
};

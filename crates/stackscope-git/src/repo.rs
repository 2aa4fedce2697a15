//! The [`GitRepo`] trait, the abstraction boundary between stackscope and git.
//!
//! The affected pipeline only ever reads from its two snapshots, plus one
//! forced checkout on a freshly cloned target:
//!
//! | Group       | Methods                                   |
//! |-------------|-------------------------------------------|
//! | Location    | `workdir`                                 |
//! | Rev-parse   | `rev_parse`, `head_oid`                   |
//! | Object read | `commit_tree`, `read_tree`                |
//! | Config      | `remotes`                                 |
//! | Checkout    | `checkout_detached`                       |

use std::path::Path;

use crate::error::GitError;
use crate::types::{GitOid, RemoteInfo, TreeEntry};

/// The git abstraction trait used by the snapshot provider and the tree differ.
///
/// # Object safety
///
/// This trait is object-safe: callers may use `&dyn GitRepo`, which is how
/// [`diff_trees_across`](crate::diff_trees_across) accepts two different
/// repositories.
pub trait GitRepo {
    /// Root of the working tree, or `None` for a bare repository.
    fn workdir(&self) -> Option<&Path>;

    /// Resolve a revision specification to an OID.
    ///
    /// Returns [`GitError::NotFound`] if the revision cannot be resolved.
    ///
    /// Replaces: `git rev-parse <spec>`.
    fn rev_parse(&self, spec: &str) -> Result<GitOid, GitError>;

    /// The commit `HEAD` points at. [`GitError::NotFound`] on an unborn branch.
    fn head_oid(&self) -> Result<GitOid, GitError> {
        self.rev_parse("HEAD")
    }

    /// The root tree of commit `oid`.
    ///
    /// Replaces: `git rev-parse <oid>^{tree}`.
    fn commit_tree(&self, oid: GitOid) -> Result<GitOid, GitError>;

    /// Read the entries of a tree object (one level, no recursion).
    ///
    /// Replaces: `git ls-tree <oid>`.
    fn read_tree(&self, oid: GitOid) -> Result<Vec<TreeEntry>, GitError>;

    /// List the configured remotes, sorted by name, with their first URL.
    ///
    /// Replaces: `git remote -v`.
    fn remotes(&self) -> Result<Vec<RemoteInfo>, GitError>;

    /// Force the working tree to match commit `oid` and detach `HEAD` at it.
    ///
    /// Local modifications are overwritten and files absent from the target
    /// tree are removed.
    ///
    /// Replaces: `git checkout --force --detach <oid>`.
    fn checkout_detached(&self, oid: GitOid) -> Result<(), GitError>;
}

//! Changed files between the HEAD commits of two snapshots.

use stackscope_core::ChangedFiles;
use stackscope_git::{GitError, GitOid, GitRepo, diff_trees_across};
use tracing::{debug, instrument};

use crate::error::AffectedError;

/// Paths that differ between the HEAD trees of `local` and `target`.
///
/// Only paths are compared; contents are never read.
///
/// # Errors
/// [`AffectedError::DiffFailure`] when a HEAD cannot be resolved or a tree
/// cannot be read.
#[instrument(skip_all)]
pub fn changed_files(local: &dyn GitRepo, target: &dyn GitRepo) -> Result<ChangedFiles, AffectedError> {
    let local_tree = head_tree(local, "local")?;
    let target_tree = head_tree(target, "target")?;

    let entries = diff_trees_across(local, local_tree, target, target_tree).map_err(diff_failure)?;
    let files: ChangedFiles = entries.into_iter().map(|entry| entry.path).collect();
    for path in files.iter() {
        debug!(%path, "changed");
    }
    debug!(count = files.len(), "changed files");
    Ok(files)
}

fn head_tree(repo: &dyn GitRepo, side: &str) -> Result<GitOid, AffectedError> {
    let head = repo.head_oid().map_err(|e| AffectedError::DiffFailure {
        detail: format!("cannot resolve {side} HEAD: {e}"),
    })?;
    repo.commit_tree(head).map_err(diff_failure)
}

fn diff_failure(err: GitError) -> AffectedError {
    AffectedError::DiffFailure {
        detail: err.to_string(),
    }
}

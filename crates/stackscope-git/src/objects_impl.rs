//! gix-backed object reads and OID conversions.

use crate::error::GitError;
use crate::gix_repo::GixRepo;
use crate::types::{EntryMode, GitOid, TreeEntry};

/// Convert our `GitOid` to a `gix::ObjectId`.
pub(crate) fn to_gix_oid(oid: GitOid) -> gix::ObjectId {
    gix::ObjectId::from(*oid.as_bytes())
}

/// Convert a `gix::oid` to our `GitOid`. Only SHA-1 object ids are supported.
pub(crate) fn from_gix_oid(oid: &gix::oid) -> Result<GitOid, GitError> {
    let bytes: [u8; 20] = oid
        .as_bytes()
        .try_into()
        .map_err(|_| GitError::InvalidOid {
            value: oid.to_string(),
            reason: "only SHA-1 repositories are supported".to_owned(),
        })?;
    Ok(GitOid::from_bytes(bytes))
}

/// Convert a gix `EntryMode` to our `EntryMode`.
fn from_gix_entry_mode(mode: gix::objs::tree::EntryMode) -> EntryMode {
    match mode.kind() {
        gix::objs::tree::EntryKind::Tree => EntryMode::Tree,
        gix::objs::tree::EntryKind::Blob => EntryMode::Blob,
        gix::objs::tree::EntryKind::BlobExecutable => EntryMode::BlobExecutable,
        gix::objs::tree::EntryKind::Link => EntryMode::Link,
        gix::objs::tree::EntryKind::Commit => EntryMode::Commit,
    }
}

pub fn read_tree(repo: &GixRepo, oid: GitOid) -> Result<Vec<TreeEntry>, GitError> {
    let tree = repo
        .repo
        .find_tree(to_gix_oid(oid))
        .map_err(|e| GitError::NotFound {
            message: format!("tree {oid}: {e}"),
        })?;

    let mut entries = Vec::new();
    for result in tree.iter() {
        let entry = result.map_err(|e| GitError::BackendError {
            message: format!("failed to decode entry of tree {oid}: {e}"),
        })?;
        entries.push(TreeEntry {
            name: entry.inner.filename.to_string(),
            mode: from_gix_entry_mode(entry.inner.mode),
            oid: from_gix_oid(entry.inner.oid)?,
        });
    }
    Ok(entries)
}

pub fn commit_tree(repo: &GixRepo, oid: GitOid) -> Result<GitOid, GitError> {
    let commit = repo
        .repo
        .find_commit(to_gix_oid(oid))
        .map_err(|e| GitError::NotFound {
            message: format!("commit {oid}: {e}"),
        })?;

    let tree = commit.tree_id().map_err(|e| GitError::BackendError {
        message: format!("failed to decode commit {oid}: {e}"),
    })?;
    from_gix_oid(tree.as_ref())
}

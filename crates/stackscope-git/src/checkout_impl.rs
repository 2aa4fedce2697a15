//! gix-backed forced checkout of a single commit.

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::AtomicBool;

use gix::bstr::ByteSlice;

use crate::error::GitError;
use crate::gix_repo::GixRepo;
use crate::objects_impl::to_gix_oid;
use crate::types::GitOid;

pub fn checkout_detached(repo: &GixRepo, oid: GitOid) -> Result<(), GitError> {
    let failed = |message: String| GitError::CheckoutFailed {
        target: oid.to_string(),
        message,
    };
    let workdir = repo
        .workdir
        .as_deref()
        .ok_or_else(|| failed("repository has no working tree".to_owned()))?;

    let commit = repo
        .repo
        .find_commit(to_gix_oid(oid))
        .map_err(|e| failed(format!("commit not found: {e}")))?;
    let tree_oid = commit
        .tree_id()
        .map_err(|e| failed(format!("failed to read tree of commit: {e}")))?
        .detach();

    let mut index_file = repo
        .repo
        .index_from_tree(&tree_oid)
        .map_err(|e| failed(format!("failed to build index from tree {tree_oid}: {e}")))?;

    // Every path in the target tree; anything else on disk is stale afterwards.
    let tree_paths: HashSet<String> = index_file
        .entries()
        .iter()
        .filter_map(|entry| entry.path(&index_file).to_str().ok().map(ToOwned::to_owned))
        .collect();

    let mut opts = repo
        .repo
        .checkout_options(gix::worktree::stack::state::attributes::Source::IdMapping)
        .map_err(|e| failed(format!("failed to get checkout options: {e}")))?;
    opts.overwrite_existing = true;
    opts.destination_is_initially_empty = false;

    let objects = repo
        .repo
        .objects
        .clone()
        .into_arc()
        .map_err(|e| failed(format!("failed to share object store: {e}")))?;

    let outcome = gix::worktree::state::checkout(
        &mut index_file,
        workdir,
        objects,
        &gix::progress::Discard,
        &gix::progress::Discard,
        &AtomicBool::new(false),
        opts,
    )
    .map_err(|e| failed(e.to_string()))?;

    if let Some(first) = outcome.errors.first() {
        return Err(failed(format!(
            "{} path(s) failed, first: {}: {}",
            outcome.errors.len(),
            first.path,
            first.error,
        )));
    }

    remove_stale_files(workdir, workdir, &tree_paths)?;

    index_file
        .write(gix::index::write::Options::default())
        .map_err(|e| failed(format!("failed to write index: {e}")))?;

    crate::refs_impl::detach_head(repo, oid)
}

/// Walk `dir` and remove files whose path relative to `workdir` is not in
/// `tree_paths`. `.git` is never touched; directories left empty are removed.
fn remove_stale_files(
    workdir: &Path,
    dir: &Path,
    tree_paths: &HashSet<String>,
) -> Result<(), GitError> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Ok(());
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if entry.file_name() == ".git" {
            continue;
        }

        if path.is_dir() {
            remove_stale_files(workdir, &path, tree_paths)?;
            // Fails when the directory still has tracked files; that's fine.
            let _ = std::fs::remove_dir(&path);
        } else {
            let rel = path
                .strip_prefix(workdir)
                .map(|p| p.to_string_lossy().replace('\\', "/"))
                .unwrap_or_default();
            if !rel.is_empty() && !tree_paths.contains(&rel) {
                std::fs::remove_file(&path)?;
            }
        }
    }

    Ok(())
}

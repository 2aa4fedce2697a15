//! gix-backed rev-parse and `HEAD` updates.

use gix::refs::transaction::PreviousValue;

use crate::error::GitError;
use crate::gix_repo::GixRepo;
use crate::objects_impl::{from_gix_oid, to_gix_oid};
use crate::types::GitOid;

pub fn rev_parse(repo: &GixRepo, spec: &str) -> Result<GitOid, GitError> {
    let id = repo
        .repo
        .rev_parse_single(spec)
        .map_err(|e| GitError::NotFound {
            message: format!("rev-parse '{spec}': {e}"),
        })?;
    from_gix_oid(id.as_ref())
}

/// Point `HEAD` directly at `oid` (detached), without dereferencing a branch.
pub fn detach_head(repo: &GixRepo, oid: GitOid) -> Result<(), GitError> {
    repo.repo
        .reference(
            "HEAD",
            to_gix_oid(oid),
            PreviousValue::Any,
            format!("checkout: moving to {oid}"),
        )
        .map_err(|e| GitError::CheckoutFailed {
            target: oid.to_string(),
            message: format!("failed to detach HEAD: {e}"),
        })?;
    Ok(())
}

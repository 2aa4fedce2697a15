//! gix-backed remote configuration reads.

use crate::error::GitError;
use crate::gix_repo::GixRepo;
use crate::types::RemoteInfo;

pub fn remotes(repo: &GixRepo) -> Result<Vec<RemoteInfo>, GitError> {
    // `remote_names` is a sorted set, so the output is ordered by name.
    let mut result = Vec::new();
    for name in repo.repo.remote_names() {
        let remote = repo
            .repo
            .find_remote(name.as_ref())
            .map_err(|e| GitError::BackendError {
                message: format!("failed to read remote '{name}': {e}"),
            })?;
        let url = remote
            .url(gix::remote::Direction::Fetch)
            .map(|u| u.to_bstring().to_string())
            .filter(|u| !u.is_empty());
        result.push(RemoteInfo {
            name: name.to_string(),
            url,
        });
    }
    Ok(result)
}

//! The gix-backed implementation of [`GitRepo`].

use std::path::{Path, PathBuf};

use crate::error::GitError;
use crate::repo::GitRepo;
use crate::types::{CloneOptions, GitOid, RemoteInfo, TreeEntry};

/// A [`GitRepo`] implementation backed by [gix](https://github.com/GitoxideLabs/gitoxide).
///
/// Construct via [`GixRepo::discover`], [`GixRepo::open_at`], or
/// [`GixRepo::clone_into`].
pub struct GixRepo {
    pub(crate) repo: gix::Repository,
    pub(crate) workdir: Option<PathBuf>,
}

impl GixRepo {
    /// Open the git repository at or above `path`.
    ///
    /// # Errors
    /// [`GitError::NotARepository`] when no `.git` is found walking upwards,
    /// or when the repository config cannot be read.
    pub fn discover(path: &Path) -> Result<Self, GitError> {
        let repo = gix::discover(path).map_err(|e| GitError::NotARepository {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(Self::from_repository(repo))
    }

    /// Open a git repository at exactly `path` (no parent discovery).
    ///
    /// # Errors
    /// [`GitError::NotARepository`] when `path` holds no readable repository.
    pub fn open_at(path: &Path) -> Result<Self, GitError> {
        let repo = gix::open_opts(path, gix::open::Options::isolated()).map_err(|e| {
            GitError::NotARepository {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
        })?;
        Ok(Self::from_repository(repo))
    }

    /// Clone `options.url` into `dest` (which must be empty or absent) and
    /// check out the requested ref, or the remote's default branch.
    ///
    /// # Errors
    /// [`GitError::CloneFailed`] for transport, auth, or ref resolution errors.
    pub fn clone_into(options: &CloneOptions, dest: &Path) -> Result<Self, GitError> {
        let repo = crate::clone_impl::clone_into(options, dest)?;
        Ok(Self::from_repository(repo))
    }

    fn from_repository(repo: gix::Repository) -> Self {
        let workdir = repo.workdir().map(Path::to_path_buf);
        Self { repo, workdir }
    }
}

impl GitRepo for GixRepo {
    fn workdir(&self) -> Option<&Path> {
        self.workdir.as_deref()
    }

    // === Rev-parse ===
    fn rev_parse(&self, spec: &str) -> Result<GitOid, GitError> {
        crate::refs_impl::rev_parse(self, spec)
    }

    // === Object read ===
    fn commit_tree(&self, oid: GitOid) -> Result<GitOid, GitError> {
        crate::objects_impl::commit_tree(self, oid)
    }

    fn read_tree(&self, oid: GitOid) -> Result<Vec<TreeEntry>, GitError> {
        crate::objects_impl::read_tree(self, oid)
    }

    // === Config ===
    fn remotes(&self) -> Result<Vec<RemoteInfo>, GitError> {
        crate::config_impl::remotes(self)
    }

    // === Checkout ===
    fn checkout_detached(&self, oid: GitOid) -> Result<(), GitError> {
        crate::checkout_impl::checkout_detached(self, oid)
    }
}

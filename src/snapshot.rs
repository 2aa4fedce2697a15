//! Repository snapshots: the local working copy and the target to compare
//! it against.
//!
//! The target comes from one of two places. In clone mode it is a fresh
//! clone of the local repository's remote, made inside a [`TempDir`] that
//! the returned [`SnapshotPair`] owns; dropping the pair (or failing before
//! one is built) deletes the directory. In path mode it is an existing
//! checkout on disk and nothing is created or deleted.

use std::fmt;
use std::path::{Path, PathBuf};

use stackscope_git::{CloneOptions, GitError, GitRepo, GixRepo, RefName, RemoteInfo, SshAuth};
use tempfile::TempDir;
use tracing::{debug, info, instrument};

use crate::error::AffectedError;

/// Prefix of the temporary clone directory.
pub const CLONE_DIR_PREFIX: &str = "stackscope-target-";

/// Which side of the comparison a snapshot is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SnapshotRole {
    Local,
    Target,
}

impl fmt::Display for SnapshotRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Target => write!(f, "target"),
        }
    }
}

/// An opened repository and the root of its working tree.
pub struct Snapshot {
    pub repo: GixRepo,
    pub root: PathBuf,
}

/// The two snapshots of one run.
///
/// In clone mode the pair owns the clone's temporary directory.
pub struct SnapshotPair {
    pub local: Snapshot,
    pub target: Snapshot,
    subdir: PathBuf,
    scratch: Option<TempDir>,
}

impl SnapshotPair {
    /// The directory the run started from, relative to the local root.
    /// Empty at the top of the working tree.
    #[must_use]
    pub fn local_subdir(&self) -> &Path {
        &self.subdir
    }

    /// The temporary clone directory, if this pair was made by cloning.
    #[must_use]
    pub fn scratch_path(&self) -> Option<&Path> {
        self.scratch.as_ref().map(TempDir::path)
    }
}

/// Clone-mode inputs.
#[derive(Clone, Debug, Default)]
pub struct CloneRequest {
    /// Full reference to clone, e.g. `refs/heads/main`. Default branch when `None`.
    pub reference: Option<String>,
    /// Commit to force-checkout after cloning.
    pub sha: Option<String>,
    pub ssh_key_path: Option<PathBuf>,
    pub ssh_key_password: Option<String>,
    /// Log clone progress (fetch and checkout tasks) as `info` events.
    pub verbose: bool,
    /// Where to create the temporary clone directory. System temp dir when `None`.
    pub temp_root: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Acquisition
// ---------------------------------------------------------------------------

/// Open the local repository at or above `cwd` and clone its remote as the target.
///
/// # Errors
/// - [`AffectedError::NotAGitRepository`] when `cwd` is not inside a working
///   tree, or the repository has no remote or the remote has no URL.
/// - [`AffectedError::CloneFailure`] for transport, auth, or ref errors.
/// - [`AffectedError::CheckoutFailure`] when `sha` cannot be resolved or
///   checked out.
#[instrument(skip(request), fields(reference = ?request.reference, sha = ?request.sha))]
pub fn acquire_by_clone(cwd: &Path, request: &CloneRequest) -> Result<SnapshotPair, AffectedError> {
    let local = open_local(cwd)?;
    let remote = pick_remote(&local)?;
    let url = remote.url.ok_or_else(|| AffectedError::NotAGitRepository {
        role: SnapshotRole::Local,
        path: local.root.clone(),
        detail: format!("remote '{}' has no URL", remote.name),
    })?;

    let mut options = CloneOptions::new(url.clone());
    if let Some(reference) = &request.reference {
        options.reference = Some(RefName::new(reference).map_err(|e| {
            AffectedError::CloneFailure {
                url: url.clone(),
                detail: e.to_string(),
            }
        })?);
    }
    options.ssh = request.ssh_key_path.as_ref().map(|key| SshAuth {
        key_path: key.clone(),
        passphrase: request.ssh_key_password.clone(),
    });
    options.progress = request.verbose;

    let scratch = match &request.temp_root {
        Some(root) => tempfile::Builder::new()
            .prefix(CLONE_DIR_PREFIX)
            .tempdir_in(root)?,
        None => tempfile::Builder::new().prefix(CLONE_DIR_PREFIX).tempdir()?,
    };

    let effective = options.effective_url();
    if request.verbose {
        info!(remote = %remote.name, url = %effective, dest = %scratch.path().display(), "cloning target");
    } else {
        debug!(remote = %remote.name, url = %effective, dest = %scratch.path().display(), "cloning target");
    }
    let repo = GixRepo::clone_into(&options, scratch.path()).map_err(|e| match e {
        GitError::CloneFailed { url, message } => AffectedError::CloneFailure {
            url,
            detail: message,
        },
        other => AffectedError::CloneFailure {
            url: effective.clone(),
            detail: other.to_string(),
        },
    })?;

    if let Some(sha) = &request.sha {
        let checkout_failed = |detail: String| AffectedError::CheckoutFailure {
            target: sha.clone(),
            detail,
        };
        let oid = repo
            .rev_parse(sha)
            .map_err(|e| checkout_failed(e.to_string()))?;
        repo.checkout_detached(oid)
            .map_err(|e| checkout_failed(e.to_string()))?;
        info!(sha = %oid, "checked out target commit");
    }

    let root = repo
        .workdir()
        .map_or_else(|| scratch.path().to_path_buf(), Path::to_path_buf);
    Ok(SnapshotPair {
        subdir: working_subdir(cwd, &local.root),
        local,
        target: Snapshot { repo, root },
        scratch: Some(scratch),
    })
}

/// Open the local repository at or above `cwd` and the target at exactly
/// `repo_path`.
///
/// # Errors
/// [`AffectedError::NotAGitRepository`] when either repository cannot be opened.
#[instrument]
pub fn acquire_by_path(cwd: &Path, repo_path: &Path) -> Result<SnapshotPair, AffectedError> {
    let local = open_local(cwd)?;
    let repo = GixRepo::open_at(repo_path).map_err(|e| not_a_repo(SnapshotRole::Target, repo_path, &e))?;
    let root = repo
        .workdir()
        .map_or_else(|| repo_path.to_path_buf(), Path::to_path_buf);
    debug!(target_root = %root.display(), "opened target repository");
    Ok(SnapshotPair {
        subdir: working_subdir(cwd, &local.root),
        local,
        target: Snapshot { repo, root },
        scratch: None,
    })
}

fn open_local(cwd: &Path) -> Result<Snapshot, AffectedError> {
    let repo = GixRepo::discover(cwd).map_err(|e| not_a_repo(SnapshotRole::Local, cwd, &e))?;
    let root = repo
        .workdir()
        .map(Path::to_path_buf)
        .ok_or_else(|| AffectedError::NotAGitRepository {
            role: SnapshotRole::Local,
            path: cwd.to_path_buf(),
            detail: "bare repository has no working tree".to_owned(),
        })?;
    debug!(local_root = %root.display(), "opened local repository");
    Ok(Snapshot { repo, root })
}

/// The working-tree root containing `cwd` and `cwd` relative to it.
///
/// Outside a git working tree `cwd` itself is the root.
#[must_use]
pub fn locate_working_tree(cwd: &Path) -> (PathBuf, PathBuf) {
    let root = GixRepo::discover(cwd)
        .ok()
        .and_then(|repo| repo.workdir().map(Path::to_path_buf));
    match root {
        Some(root) => {
            let subdir = working_subdir(cwd, &root);
            (root, subdir)
        }
        None => (cwd.to_path_buf(), PathBuf::new()),
    }
}

/// `cwd` relative to `root`, comparing canonical paths when the plain ones
/// do not line up (symlinked temp dirs, relative `cwd`).
fn working_subdir(cwd: &Path, root: &Path) -> PathBuf {
    if let Ok(rel) = cwd.strip_prefix(root) {
        return rel.to_path_buf();
    }
    match (cwd.canonicalize(), root.canonicalize()) {
        (Ok(cwd), Ok(root)) => cwd
            .strip_prefix(&root)
            .map(Path::to_path_buf)
            .unwrap_or_default(),
        _ => PathBuf::new(),
    }
}

/// `origin` when configured, else the first remote by name.
fn pick_remote(local: &Snapshot) -> Result<RemoteInfo, AffectedError> {
    let remotes = local
        .repo
        .remotes()
        .map_err(|e| not_a_repo(SnapshotRole::Local, &local.root, &e))?;
    let position = remotes.iter().position(|r| r.name == "origin").unwrap_or(0);
    remotes
        .into_iter()
        .nth(position)
        .ok_or_else(|| AffectedError::NotAGitRepository {
            role: SnapshotRole::Local,
            path: local.root.clone(),
            detail: "no remote configured".to_owned(),
        })
}

fn not_a_repo(role: SnapshotRole, path: &Path, err: &GitError) -> AffectedError {
    let detail = match err {
        GitError::NotARepository { message, .. } => message.clone(),
        other => other.to_string(),
    };
    AffectedError::NotAGitRepository {
        role,
        path: path.to_path_buf(),
        detail,
    }
}

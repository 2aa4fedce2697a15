//! Error type for the affected pipeline.
//!
//! Every stage of `describe affected` fails with one [`AffectedError`]. There
//! is no partial success: the first failure discards everything computed so
//! far. Messages say what went wrong and end with a "To fix:" hint.

use std::fmt;
use std::path::PathBuf;

use stackscope_core::EnrichError;

use crate::snapshot::SnapshotRole;

// ---------------------------------------------------------------------------
// AffectedError
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum AffectedError {
    /// A snapshot root has no usable git metadata, remote, or remote URL.
    NotAGitRepository {
        role: SnapshotRole,
        path: PathBuf,
        detail: String,
    },

    /// Cloning the target failed (network, auth, or reference resolution).
    CloneFailure { url: String, detail: String },

    /// The requested commit could not be resolved or checked out.
    CheckoutFailure { target: String, detail: String },

    /// Resolving HEADs or diffing the two trees failed.
    DiffFailure { detail: String },

    /// The stack loader failed for one snapshot.
    StackResolutionFailure { snapshot: SnapshotRole, detail: String },

    /// A derived identifier could not be built for an affected component.
    IdentifierDerivationFailure {
        component: String,
        stack: String,
        detail: String,
    },

    /// `describe component` found no such component in the stack.
    ComponentNotFound { component: String, stack: String },

    /// The configuration file could not be loaded, or describes an
    /// impossible layout.
    Config { path: PathBuf, detail: String },

    Io(std::io::Error),
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

impl fmt::Display for AffectedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAGitRepository { role, path, detail } => {
                write!(
                    f,
                    "{role} snapshot at '{}' is not a usable git repository: {detail}\n  To fix: run from inside a git checkout with a remote configured:\n    git remote -v",
                    path.display()
                )
            }
            Self::CloneFailure { url, detail } => {
                write!(
                    f,
                    "failed to clone '{url}': {detail}\n  To fix: check network access, credentials (--ssh-key), and that --ref names an existing reference such as refs/heads/main."
                )
            }
            Self::CheckoutFailure { target, detail } => {
                write!(
                    f,
                    "failed to check out '{target}': {detail}\n  To fix: pass a commit that exists on the cloned reference:\n    git log --oneline <ref>"
                )
            }
            Self::DiffFailure { detail } => {
                write!(
                    f,
                    "failed to diff the two snapshots: {detail}\n  To fix: make sure both repositories have a commit checked out, then run `git fsck` on each."
                )
            }
            Self::StackResolutionFailure { snapshot, detail } => {
                write!(
                    f,
                    "failed to resolve stacks in the {snapshot} snapshot: {detail}\n  To fix: correct the stack manifests, or the stack paths in stackscope.toml."
                )
            }
            Self::IdentifierDerivationFailure {
                component,
                stack,
                detail,
            } => {
                write!(
                    f,
                    "failed to derive identifiers for component '{component}' in stack '{stack}': {detail}\n  To fix: define the missing vars in the stack, or adjust the name patterns in stackscope.toml."
                )
            }
            Self::ComponentNotFound { component, stack } => {
                write!(
                    f,
                    "component '{component}' not found in stack '{stack}'.\n  To fix: check the stack name and the component's key under `components:`."
                )
            }
            Self::Config { path, detail } => {
                write!(
                    f,
                    "configuration error in '{}': {detail}\n  To fix: edit the config file and correct the issue.",
                    path.display()
                )
            }
            Self::Io(err) => {
                write!(
                    f,
                    "I/O error: {err}\n  To fix: check file permissions and disk space."
                )
            }
        }
    }
}

impl std::error::Error for AffectedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// From impls
// ---------------------------------------------------------------------------

impl From<std::io::Error> for AffectedError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<crate::config::ConfigError> for AffectedError {
    fn from(err: crate::config::ConfigError) -> Self {
        Self::Config {
            path: err.path.unwrap_or_default(),
            detail: err.message,
        }
    }
}

impl From<EnrichError> for AffectedError {
    fn from(err: EnrichError) -> Self {
        Self::IdentifierDerivationFailure {
            component: err.component,
            stack: err.stack,
            detail: err.source.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

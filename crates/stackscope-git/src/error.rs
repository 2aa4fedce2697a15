//! Error types for git operations.
//!
//! [`GitError`] is the single error type returned by all [`GitRepo`](crate::GitRepo) trait
//! methods and constructors. Variants separate the failure modes the affected
//! pipeline reports differently (not a repository, clone, checkout) from
//! generic backend failures.

use std::path::PathBuf;

use thiserror::Error;

/// Errors returned by [`GitRepo`](crate::GitRepo) operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// A requested object, ref, or path was not found.
    #[error("not found: {message}")]
    NotFound {
        /// Human-readable description of what was missing.
        message: String,
    },

    /// The path has no discoverable git metadata, or its config cannot be read.
    #[error("{} is not a git repository: {message}", path.display())]
    NotARepository {
        /// The path that was opened.
        path: PathBuf,
        /// Backend detail.
        message: String,
    },

    /// An OID string could not be parsed or was otherwise invalid.
    #[error("invalid OID `{value}`: {reason}")]
    InvalidOid {
        /// The raw value that failed validation.
        value: String,
        /// Why validation failed.
        reason: String,
    },

    /// Cloning a remote failed (network, auth, or reference resolution).
    #[error("clone of `{url}` failed: {message}")]
    CloneFailed {
        /// The URL that was cloned.
        url: String,
        /// Details about the failure.
        message: String,
    },

    /// Checking out a commit into a working tree failed.
    #[error("checkout of `{target}` failed: {message}")]
    CheckoutFailed {
        /// The commit (or spec) that was being checked out.
        target: String,
        /// Details about the failure.
        message: String,
    },

    /// An I/O error occurred (file system, process spawn, etc.).
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The underlying git backend returned an unclassified error.
    ///
    /// The `message` should include enough context to diagnose the failure.
    #[error("git backend error: {message}")]
    BackendError {
        /// Freeform error description from the backend.
        message: String,
    },
}

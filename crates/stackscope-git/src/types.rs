//! Core types for the stackscope git abstraction layer.
//!
//! These types form the vocabulary shared between the [`GitRepo`](crate::GitRepo) trait and
//! the other stackscope crates. They contain no gix types; the backend is an
//! implementation detail.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// GitOid
// ---------------------------------------------------------------------------

/// A git object identifier (SHA-1, 20 bytes).
///
/// Displays as 40 lowercase hex characters. Two OIDs from different
/// repositories are equal exactly when the objects have identical content,
/// which is what lets the tree differ skip unchanged subtrees across clones.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GitOid([u8; 20]);

impl GitOid {
    /// Create a `GitOid` from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Return the raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Abbreviated (7 character) hex form, for log lines.
    #[must_use]
    pub fn short(&self) -> String {
        let mut full = self.to_string();
        full.truncate(7);
        full
    }
}

impl fmt::Display for GitOid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for GitOid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GitOid({self})")
    }
}

impl FromStr for GitOid {
    type Err = OidParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: String| OidParseError {
            value: s.to_owned(),
            reason,
        };
        if s.len() != 40 {
            return Err(invalid(format!(
                "expected 40 hex characters, got {}",
                s.len()
            )));
        }
        let mut bytes = [0u8; 20];
        for (slot, pair) in bytes.iter_mut().zip(s.as_bytes().chunks(2)) {
            let text = std::str::from_utf8(pair)
                .map_err(|_| invalid("non-ASCII character".to_owned()))?;
            *slot = u8::from_str_radix(text, 16)
                .map_err(|_| invalid(format!("invalid hex pair '{text}'")))?;
        }
        Ok(Self(bytes))
    }
}

/// Error from parsing a hex string into a [`GitOid`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OidParseError {
    /// The raw value that failed.
    pub value: String,
    /// Why it failed.
    pub reason: String,
}

impl fmt::Display for OidParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid OID {:?}: {}", self.value, self.reason)
    }
}

impl std::error::Error for OidParseError {}

// ---------------------------------------------------------------------------
// RefName
// ---------------------------------------------------------------------------

/// A validated, fully qualified git ref name (e.g. `refs/heads/main`,
/// `refs/tags/v1.2.0`) or the bare `HEAD`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RefName(String);

impl RefName {
    /// Create a new `RefName`, validating that it looks like a git ref.
    ///
    /// # Errors
    /// Returns an error if the name is empty, contains whitespace, or doesn't
    /// start with `refs/` (and isn't `HEAD`).
    pub fn new(name: &str) -> Result<Self, RefNameError> {
        let reject = |reason: &str| RefNameError {
            value: name.to_owned(),
            reason: reason.to_owned(),
        };
        if name.is_empty() {
            return Err(reject("ref name must not be empty"));
        }
        if name.chars().any(char::is_whitespace) {
            return Err(reject("ref name must not contain whitespace"));
        }
        if name == "HEAD" || name.starts_with("refs/") {
            Ok(Self(name.to_owned()))
        } else {
            Err(reject(
                "ref name must be fully qualified (e.g. 'refs/heads/main') or 'HEAD'",
            ))
        }
    }

    /// Return the ref name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RefName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RefName {
    type Err = RefNameError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Error from validating a [`RefName`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefNameError {
    /// The invalid value.
    pub value: String,
    /// Why it was rejected.
    pub reason: String,
}

impl fmt::Display for RefNameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid ref name {:?}: {}", self.value, self.reason)
    }
}

impl std::error::Error for RefNameError {}

// ---------------------------------------------------------------------------
// Tree types
// ---------------------------------------------------------------------------

/// The file mode of a tree entry (analogous to `git ls-tree` mode column).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntryMode {
    /// Regular file (`100644`).
    Blob,
    /// Executable file (`100755`).
    BlobExecutable,
    /// Subdirectory (`040000`).
    Tree,
    /// Symbolic link (`120000`).
    Link,
    /// Gitlink / submodule (`160000`).
    Commit,
}

impl EntryMode {
    /// `true` for subdirectories.
    #[must_use]
    pub const fn is_tree(self) -> bool {
        matches!(self, Self::Tree)
    }
}

/// A single entry in a git tree object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeEntry {
    /// File or directory name (just the basename, not a full path).
    pub name: String,
    /// The entry mode.
    pub mode: EntryMode,
    /// The OID of the blob, tree, or commit this entry points to.
    pub oid: GitOid,
}

// ---------------------------------------------------------------------------
// Diff types
// ---------------------------------------------------------------------------

/// The kind of change detected between two trees.
///
/// Renames are not detected; a moved file shows up as a deletion plus an
/// addition, so both the old and the new folder count as changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeType {
    /// File exists only in the new tree.
    Added,
    /// File content or mode differs.
    Modified,
    /// File exists only in the old tree.
    Deleted,
}

/// A single file-level change between two trees.
///
/// Produced by [`diff_trees_across`](crate::diff_trees_across).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiffEntry {
    /// Slash-separated path relative to the repository root.
    pub path: String,
    /// What kind of change occurred.
    pub change_type: ChangeType,
    /// OID of the old object (`None` for additions).
    pub old_oid: Option<GitOid>,
    /// OID of the new object (`None` for deletions).
    pub new_oid: Option<GitOid>,
    /// File mode in the old tree.
    pub old_mode: Option<EntryMode>,
    /// File mode in the new tree.
    pub new_mode: Option<EntryMode>,
}

// ---------------------------------------------------------------------------
// Remote and clone types
// ---------------------------------------------------------------------------

/// A configured remote and its first fetch URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteInfo {
    /// Remote name (e.g. `"origin"`).
    pub name: String,
    /// The first configured URL, if any.
    pub url: Option<String>,
}

/// Private-key authentication for cloning over ssh.
#[derive(Clone, PartialEq, Eq)]
pub struct SshAuth {
    /// Path to the private key file.
    pub key_path: PathBuf,
    /// Passphrase for an encrypted key.
    pub passphrase: Option<String>,
}

impl fmt::Debug for SshAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SshAuth")
            .field("key_path", &self.key_path)
            .field("passphrase", &self.passphrase.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Inputs for [`GixRepo::clone_into`](crate::GixRepo::clone_into).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CloneOptions {
    /// The URL (or local path) to clone.
    pub url: String,
    /// Ref to check out; the remote's default branch when `None`.
    pub reference: Option<RefName>,
    /// Private-key authentication. Rewrites `https://` URLs to `ssh://`.
    pub ssh: Option<SshAuth>,
    /// Report fetch and checkout progress as `tracing` events.
    pub progress: bool,
}

impl CloneOptions {
    /// Clone `url` at its default branch, without authentication.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reference: None,
            ssh: None,
            progress: false,
        }
    }

    /// The URL actually handed to the transport.
    ///
    /// With ssh auth, `https://host/path` becomes `ssh://git@host/path` (a user
    /// already present in the URL is kept).
    #[must_use]
    pub fn effective_url(&self) -> String {
        if self.ssh.is_none() {
            return self.url.clone();
        }
        match self.url.strip_prefix("https://") {
            Some(rest) => {
                let host = rest.split('/').next().unwrap_or_default();
                if host.contains('@') {
                    format!("ssh://{rest}")
                } else {
                    format!("ssh://git@{rest}")
                }
            }
            None => self.url.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

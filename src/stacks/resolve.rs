//! Resolution contexts and the stack-loader seam.
//!
//! Stack configuration points at folders relative to the repository root.
//! The current snapshot resolves them against the local working tree; the
//! target snapshot resolves the same relative paths against its own root.
//! Each side gets its own immutable [`ResolutionContext`], built once.
//!
//! A relative `base_path` is taken relative to the directory the command runs
//! in, the same directory `stackscope.toml` is read from. Running from
//! `<repo>/infra` with the default `base_path` therefore finds stacks in
//! `<repo>/infra/stacks` in both snapshots.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde_yaml::Value;
use stackscope_core::layout::clean;
use stackscope_core::{ComponentLayout, ComponentType, Stacks, parse_stacks};
use tracing::{info, instrument};

use crate::config::StackscopeConfig;
use crate::error::AffectedError;
use crate::snapshot::SnapshotRole;

/// Stack name to resolved stack document.
pub type RawStacks = BTreeMap<String, Value>;

// ---------------------------------------------------------------------------
// ResolutionContext
// ---------------------------------------------------------------------------

/// Where one snapshot's stacks and components live.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolutionContext {
    repo_root: PathBuf,
    base_path: PathBuf,
    stacks_dir: PathBuf,
    terraform_dir: PathBuf,
    helmfile_dir: PathBuf,
    layout: ComponentLayout,
    included_paths: Vec<String>,
    excluded_paths: Vec<String>,
    is_target_snapshot: bool,
}

impl ResolutionContext {
    /// Context for the local working tree at `local_root`.
    ///
    /// # Errors
    /// [`AffectedError::Config`] when an absolute `base_path` lies outside
    /// `local_root`.
    pub fn current(config: &StackscopeConfig, local_root: &Path) -> Result<Self, AffectedError> {
        Self::current_in(config, local_root, Path::new(""))
    }

    /// Like [`ResolutionContext::current`], for a command run from `subdir`
    /// (relative to `local_root`).
    ///
    /// # Errors
    /// As for [`ResolutionContext::current`], and when a relative
    /// `base_path` climbs out of the repository.
    pub fn current_in(
        config: &StackscopeConfig,
        local_root: &Path,
        subdir: &Path,
    ) -> Result<Self, AffectedError> {
        Self::build(config, local_root, subdir, local_root, false)
    }

    /// Context for the target snapshot at `target_root`.
    ///
    /// An absolute `base_path` is first made relative to `local_root`, then
    /// re-rooted under `target_root`.
    ///
    /// # Errors
    /// As for [`ResolutionContext::current`].
    pub fn target(
        config: &StackscopeConfig,
        local_root: &Path,
        target_root: &Path,
    ) -> Result<Self, AffectedError> {
        Self::target_in(config, local_root, Path::new(""), target_root)
    }

    /// Like [`ResolutionContext::target`], for a command run from `subdir`
    /// of the local repository. The same `subdir` is used under `target_root`.
    ///
    /// # Errors
    /// As for [`ResolutionContext::current_in`].
    pub fn target_in(
        config: &StackscopeConfig,
        local_root: &Path,
        subdir: &Path,
        target_root: &Path,
    ) -> Result<Self, AffectedError> {
        Self::build(config, local_root, subdir, target_root, true)
    }

    fn build(
        config: &StackscopeConfig,
        local_root: &Path,
        subdir: &Path,
        repo_root: &Path,
        is_target_snapshot: bool,
    ) -> Result<Self, AffectedError> {
        let base_path = relative_base(&config.base_path, local_root, subdir)?;
        let root = repo_root.join(&base_path);
        let layout = ComponentLayout::new(
            base_path.clone(),
            &config.components.terraform.base_path,
            &config.components.helmfile.base_path,
        );
        Ok(Self {
            repo_root: repo_root.to_path_buf(),
            stacks_dir: root.join(&config.stacks.base_path),
            terraform_dir: root.join(&config.components.terraform.base_path),
            helmfile_dir: root.join(&config.components.helmfile.base_path),
            base_path,
            layout,
            included_paths: config.stacks.included_paths.clone(),
            excluded_paths: config.stacks.excluded_paths.clone(),
            is_target_snapshot,
        })
    }

    #[must_use]
    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    /// `base_path`, relative to the repository root.
    #[must_use]
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    #[must_use]
    pub fn stacks_dir(&self) -> &Path {
        &self.stacks_dir
    }

    /// Absolute folder holding sources of `ty` components.
    #[must_use]
    pub fn components_dir(&self, ty: ComponentType) -> &Path {
        match ty {
            ComponentType::Terraform => &self.terraform_dir,
            ComponentType::Helmfile => &self.helmfile_dir,
        }
    }

    /// Repository-relative component layout, identical for both snapshots.
    #[must_use]
    pub const fn layout(&self) -> &ComponentLayout {
        &self.layout
    }

    #[must_use]
    pub fn included_paths(&self) -> &[String] {
        &self.included_paths
    }

    #[must_use]
    pub fn excluded_paths(&self) -> &[String] {
        &self.excluded_paths
    }

    #[must_use]
    pub const fn is_target_snapshot(&self) -> bool {
        self.is_target_snapshot
    }

    #[must_use]
    pub const fn role(&self) -> SnapshotRole {
        if self.is_target_snapshot {
            SnapshotRole::Target
        } else {
            SnapshotRole::Local
        }
    }
}

fn relative_base(
    base_path: &str,
    local_root: &Path,
    subdir: &Path,
) -> Result<PathBuf, AffectedError> {
    let base = Path::new(base_path);
    let outside = || AffectedError::Config {
        path: PathBuf::from(crate::config::CONFIG_FILE),
        detail: format!(
            "base_path '{}' is outside the repository at '{}'",
            base.display(),
            local_root.display()
        ),
    };
    if base.is_absolute() {
        return base
            .strip_prefix(local_root)
            .map(Path::to_path_buf)
            .map_err(|_| outside());
    }
    let joined = clean(&subdir.join(base));
    if joined.starts_with("..") {
        return Err(outside());
    }
    Ok(joined)
}

// ---------------------------------------------------------------------------
// StackLoader
// ---------------------------------------------------------------------------

/// Narrows what a loader resolves. Empty fields select everything.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StackFilter {
    pub stack: Option<String>,
    pub components: Vec<String>,
    pub component_types: Vec<ComponentType>,
}

impl StackFilter {
    #[must_use]
    pub fn matches_stack(&self, name: &str) -> bool {
        self.stack.as_deref().is_none_or(|s| s == name)
    }

    #[must_use]
    pub fn matches_component(&self, ty: ComponentType, name: &str) -> bool {
        (self.component_types.is_empty() || self.component_types.contains(&ty))
            && (self.components.is_empty() || self.components.iter().any(|c| c == name))
    }
}

/// Error from a [`StackLoader`].
#[derive(Debug)]
pub struct LoaderError {
    /// The manifest being read, if the error is tied to one.
    pub path: Option<PathBuf>,
    pub message: String,
}

impl LoaderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            path: None,
            message: message.into(),
        }
    }

    pub fn at(path: &Path, message: impl Into<String>) -> Self {
        Self {
            path: Some(path.to_path_buf()),
            message: message.into(),
        }
    }
}

impl fmt::Display for LoaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(p) => write!(f, "{}: {}", p.display(), self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for LoaderError {}

/// Turns the manifests of one snapshot into fully merged stacks.
///
/// Each returned value has the shape
/// `{components: {terraform: {<name>: {...}}, helmfile: {<name>: {...}}}}`.
/// Loaders must produce the same shape for both snapshots.
pub trait StackLoader {
    /// # Errors
    /// Any failure reading or merging manifests.
    fn resolve_stacks(
        &self,
        ctx: &ResolutionContext,
        filter: &StackFilter,
    ) -> Result<RawStacks, LoaderError>;
}

/// Resolve both snapshots and parse them into the typed model.
///
/// # Errors
/// [`AffectedError::StackResolutionFailure`] naming the snapshot whose
/// loader failed. The target is not resolved if the current side fails.
#[instrument(skip_all)]
pub fn resolve_snapshot_stacks(
    loader: &dyn StackLoader,
    current: &ResolutionContext,
    target: &ResolutionContext,
    filter: &StackFilter,
) -> Result<(Stacks, Stacks), AffectedError> {
    let resolve = |ctx: &ResolutionContext| {
        loader
            .resolve_stacks(ctx, filter)
            .map(|raw| parse_stacks(&raw))
            .map_err(|e| AffectedError::StackResolutionFailure {
                snapshot: ctx.role(),
                detail: e.to_string(),
            })
    };
    let current_stacks = resolve(current)?;
    let target_stacks = resolve(target)?;
    info!(
        current = current_stacks.len(),
        target = target_stacks.len(),
        "resolved stacks"
    );
    Ok((current_stacks, target_stacks))
}

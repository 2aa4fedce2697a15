//! The `describe affected` pipeline.
//!
//! ```text
//! snapshots ─┬─ HEADs ── changed files ───────────────┐
//!            └─ contexts ── stacks (current, target) ──┴─ scan ── enrich
//! ```
//!
//! Every stage either succeeds completely or ends the run with one
//! [`AffectedError`]; callers never see partial results.

use std::path::Path;

use serde_yaml::Value;
use stackscope_core::{
    AffectedRecord, ComponentType, IdentifierDeriver, ScanContext, enrich_all, find_affected,
};
use stackscope_git::GitRepo;
use tracing::{info, instrument};

use crate::config::StackscopeConfig;
use crate::diff::changed_files;
use crate::error::AffectedError;
use crate::snapshot::{
    CloneRequest, SnapshotPair, acquire_by_clone, acquire_by_path, locate_working_tree,
};
use crate::stacks::{ResolutionContext, StackFilter, StackLoader, resolve_snapshot_stacks};

/// Components of the local snapshot that differ from the target snapshot.
///
/// Records are ordered by stack, then component type (`terraform` first),
/// then component name.
///
/// # Errors
/// The first failing stage's [`AffectedError`].
#[instrument(skip_all, fields(local = %pair.local.root.display(), target = %pair.target.root.display()))]
pub fn describe_affected(
    config: &StackscopeConfig,
    pair: &SnapshotPair,
    loader: &dyn StackLoader,
    deriver: &dyn IdentifierDeriver,
) -> Result<Vec<AffectedRecord>, AffectedError> {
    let local_head = pair
        .local
        .repo
        .head_oid()
        .map_err(|e| AffectedError::DiffFailure {
            detail: format!("cannot resolve local HEAD: {e}"),
        })?;
    let target_head = pair
        .target
        .repo
        .head_oid()
        .map_err(|e| AffectedError::DiffFailure {
            detail: format!("cannot resolve target HEAD: {e}"),
        })?;
    info!(local = %local_head.short(), target = %target_head.short(), "comparing snapshots");

    let changed = changed_files(&pair.local.repo, &pair.target.repo)?;

    let subdir = pair.local_subdir();
    let current_ctx = ResolutionContext::current_in(config, &pair.local.root, subdir)?;
    let target_ctx =
        ResolutionContext::target_in(config, &pair.local.root, subdir, &pair.target.root)?;
    let (current, target) =
        resolve_snapshot_stacks(loader, &current_ctx, &target_ctx, &StackFilter::default())?;

    let scan = ScanContext {
        changed_files: &changed,
        layout: current_ctx.layout(),
    };
    let candidates = find_affected(&current, &target, &scan);
    let records = enrich_all(&candidates, deriver)?;
    info!(
        changed_files = changed.len(),
        affected = records.len(),
        "describe affected complete"
    );
    Ok(records)
}

/// Clone the local repository's remote and compare against it.
///
/// The clone lives in a temporary directory that is removed before this
/// function returns, whatever the outcome.
///
/// # Errors
/// See [`acquire_by_clone`] and [`describe_affected`].
pub fn describe_affected_with_clone(
    config: &StackscopeConfig,
    cwd: &Path,
    request: &CloneRequest,
    loader: &dyn StackLoader,
    deriver: &dyn IdentifierDeriver,
) -> Result<Vec<AffectedRecord>, AffectedError> {
    let pair = acquire_by_clone(cwd, request)?;
    describe_affected(config, &pair, loader, deriver)
}

/// Compare against an existing checkout at `repo_path`.
///
/// # Errors
/// See [`acquire_by_path`] and [`describe_affected`].
pub fn describe_affected_with_repo_path(
    config: &StackscopeConfig,
    cwd: &Path,
    repo_path: &Path,
    loader: &dyn StackLoader,
    deriver: &dyn IdentifierDeriver,
) -> Result<Vec<AffectedRecord>, AffectedError> {
    let pair = acquire_by_path(cwd, repo_path)?;
    describe_affected(config, &pair, loader, deriver)
}

/// The merged configuration of `component` in `stack`, resolved from the
/// working tree containing `cwd`. Stacks are located the same way as for
/// [`describe_affected`]. Terraform is searched before helmfile.
///
/// # Errors
/// [`AffectedError::StackResolutionFailure`] when the stack cannot be
/// loaded, [`AffectedError::ComponentNotFound`] when it has no such component.
#[instrument(skip(config, loader))]
pub fn describe_component(
    config: &StackscopeConfig,
    cwd: &Path,
    component: &str,
    stack: &str,
    loader: &dyn StackLoader,
) -> Result<Value, AffectedError> {
    let (root, subdir) = locate_working_tree(cwd);
    let ctx = ResolutionContext::current_in(config, &root, &subdir)?;
    let filter = StackFilter {
        stack: Some(stack.to_owned()),
        components: vec![component.to_owned()],
        component_types: Vec::new(),
    };
    let raw = loader
        .resolve_stacks(&ctx, &filter)
        .map_err(|e| AffectedError::StackResolutionFailure {
            snapshot: ctx.role(),
            detail: e.to_string(),
        })?;
    let not_found = || AffectedError::ComponentNotFound {
        component: component.to_owned(),
        stack: stack.to_owned(),
    };
    let components = raw.get(stack).and_then(|s| s.get("components")).ok_or_else(not_found)?;
    ComponentType::ALL
        .iter()
        .find_map(|ty| components.get(ty.as_str()).and_then(|c| c.get(component)))
        .cloned()
        .ok_or_else(not_found)
}

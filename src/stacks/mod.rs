//! Stack resolution for both snapshots.
//!
//! - [`resolve`]: per-snapshot [`ResolutionContext`]s, the [`StackLoader`]
//!   seam, and [`resolve_snapshot_stacks`].
//! - [`loader`]: [`YamlStackLoader`], the built-in loader for YAML stack
//!   manifests with imports and component inheritance.

pub mod loader;
pub mod resolve;

pub use loader::YamlStackLoader;
pub use resolve::{
    LoaderError, RawStacks, ResolutionContext, StackFilter, StackLoader, resolve_snapshot_stacks,
};

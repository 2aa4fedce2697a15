//! Typed stack model.
//!
//! The stack loader produces loosely shaped YAML. [`parse_stacks`] turns it
//! into [`StackTree`]s once, right after resolution, so the scanner and the
//! enricher work on typed fields instead of walking nested mappings.

pub mod affected;
pub mod types;

pub use affected::{AffectedReason, AffectedRecord, ChangedFiles};
pub use types::{
    find_component, parse_stacks, ComponentConfig, ComponentType, ParseComponentTypeError,
    Section, StackTree, Stacks,
};

//! Core domain logic for stackscope.
//!
//! Everything in this crate is pure: no git, no file system, no process
//! environment. The root `stackscope` crate acquires snapshots and resolves
//! stacks, then hands the results to the types and functions here.
//!
//! - [`merge`]: deep merge of ordered YAML mappings.
//! - [`model`]: typed stacks, components, changed files, affected records.
//! - [`layout`]: where component folders live relative to the repo root.
//! - [`scan`]: the ordered classification criteria and the scanner.
//! - [`naming`]: derived external identifiers (Spacelift, Atlantis, paths).
//! - [`enrich`]: turns scan candidates into full affected records.

pub mod enrich;
pub mod layout;
pub mod merge;
pub mod model;
pub mod naming;
pub mod scan;

pub use enrich::{enrich, enrich_all, stack_slug, EnrichError};
pub use layout::ComponentLayout;
pub use merge::{merge, merge_with_options, MergeError, MergeOptions};
pub use model::{
    parse_stacks, AffectedReason, AffectedRecord, ChangedFiles, ComponentConfig, ComponentType,
    Section, StackTree, Stacks,
};
pub use naming::{AtlantisProjectTemplate, ContextNaming, IdentifierDeriver, NamingError};
pub use scan::{classify, find_affected, Candidate, Criterion, ScanContext, CRITERIA};

//! Turn scan candidates into affected records.

use serde_yaml::Mapping;
use thiserror::Error;

use crate::model::{AffectedRecord, ComponentType};
use crate::naming::{IdentifierDeriver, NamingError};
use crate::scan::Candidate;

/// Identifier derivation failed for one record.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("cannot derive identifiers for component '{component}' in stack '{stack}': {source}")]
pub struct EnrichError {
    pub component: String,
    pub stack: String,
    #[source]
    pub source: NamingError,
}

/// `<stack>-<component>`, with `/` in the component name replaced by `-`.
#[must_use]
pub fn stack_slug(stack: &str, component: &str) -> String {
    format!("{stack}-{}", component.replace('/', "-"))
}

/// Build the record for one candidate.
///
/// Terraform components also get their Spacelift and Atlantis names.
///
/// # Errors
/// Any error from `deriver`.
pub fn enrich(
    candidate: &Candidate<'_>,
    deriver: &dyn IdentifierDeriver,
) -> Result<AffectedRecord, EnrichError> {
    let mut record = AffectedRecord {
        component: candidate.component.to_owned(),
        component_type: candidate.component_type,
        component_path: deriver.component_path(candidate.config, candidate.component_type),
        stack: candidate.stack.to_owned(),
        stack_slug: stack_slug(candidate.stack, candidate.component),
        spacelift_stack: String::new(),
        atlantis_project: String::new(),
        affected: candidate.reason,
    };

    if candidate.component_type == ComponentType::Terraform {
        let empty = Mapping::new();
        let vars = candidate.config.vars.as_ref().unwrap_or(&empty);
        let settings = candidate.config.settings.as_ref().unwrap_or(&empty);
        let wrap = |source| EnrichError {
            component: candidate.component.to_owned(),
            stack: candidate.stack.to_owned(),
            source,
        };
        record.spacelift_stack = deriver
            .spacelift_stack_name(candidate.component, candidate.stack, settings, vars)
            .map_err(wrap)?;
        record.atlantis_project = deriver
            .atlantis_project_name(candidate.component, settings, vars)
            .map_err(wrap)?;
    }
    Ok(record)
}

/// Enrich every candidate, stopping at the first error.
///
/// # Errors
/// The first [`EnrichError`]; no partial result is returned.
pub fn enrich_all(
    candidates: &[Candidate<'_>],
    deriver: &dyn IdentifierDeriver,
) -> Result<Vec<AffectedRecord>, EnrichError> {
    candidates.iter().map(|c| enrich(c, deriver)).collect()
}

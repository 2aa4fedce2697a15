//! Changed files and affected records.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::types::ComponentType;

// ---------------------------------------------------------------------------
// ChangedFiles
// ---------------------------------------------------------------------------

/// Repository-relative paths that differ between two snapshots.
///
/// Paths use `/` separators and keep the order the differ produced them in.
/// Empty names are dropped on insert.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChangedFiles(Vec<String>);

impl ChangedFiles {
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Add a path. Returns `false` when the path was empty and ignored.
    pub fn push(&mut self, path: impl Into<String>) -> bool {
        let path = path.into();
        if path.is_empty() {
            return false;
        }
        self.0.push(path);
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `true` if any changed path lies inside `folder`.
    ///
    /// Matching is per path component, so `components/terraform/vpc` does not
    /// claim `components/terraform/vpc-peering/main.tf`.
    #[must_use]
    pub fn any_under(&self, folder: &Path) -> bool {
        self.iter().any(|f| Path::new(f).starts_with(folder))
    }
}

impl<S: Into<String>> FromIterator<S> for ChangedFiles {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut files = Self::new();
        for path in iter {
            files.push(path);
        }
        files
    }
}

// ---------------------------------------------------------------------------
// AffectedReason
// ---------------------------------------------------------------------------

/// Why a component was reported as affected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AffectedReason {
    #[serde(rename = "stack.metadata")]
    StackMetadata,
    #[serde(rename = "component")]
    Component,
    #[serde(rename = "stack.vars")]
    StackVars,
    #[serde(rename = "stack.env")]
    StackEnv,
    #[serde(rename = "stack.settings")]
    StackSettings,
}

impl AffectedReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StackMetadata => "stack.metadata",
            Self::Component => "component",
            Self::StackVars => "stack.vars",
            Self::StackEnv => "stack.env",
            Self::StackSettings => "stack.settings",
        }
    }
}

impl fmt::Display for AffectedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// AffectedRecord
// ---------------------------------------------------------------------------

/// One affected component in one stack, ready for output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffectedRecord {
    pub component: String,
    pub component_type: ComponentType,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub component_path: String,
    pub stack: String,
    pub stack_slug: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub spacelift_stack: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub atlantis_project: String,
    pub affected: AffectedReason,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_paths_are_dropped() {
        let files: ChangedFiles = ["a.tf", "", "b/c.tf"].into_iter().collect();
        assert_eq!(files.len(), 2);
        assert_eq!(files.iter().collect::<Vec<_>>(), ["a.tf", "b/c.tf"]);
    }

    #[test]
    fn any_under_matches_whole_components() {
        let files: ChangedFiles = ["components/terraform/vpc-peering/main.tf"]
            .into_iter()
            .collect();
        assert!(!files.any_under(Path::new("components/terraform/vpc")));
        assert!(files.any_under(Path::new("components/terraform")));
    }

    #[test]
    fn record_serializes_with_reason_vocabulary() {
        let record = AffectedRecord {
            component: "vpc".into(),
            component_type: ComponentType::Terraform,
            component_path: "components/terraform/vpc".into(),
            stack: "dev".into(),
            stack_slug: "dev-vpc".into(),
            spacelift_stack: String::new(),
            atlantis_project: String::new(),
            affected: AffectedReason::StackVars,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["affected"], "stack.vars");
        assert_eq!(json["component_type"], "terraform");
        assert!(json.get("spacelift_stack").is_none());
        assert!(json.get("atlantis_project").is_none());
    }
}

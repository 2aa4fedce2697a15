//! Component types, component configuration, and stack trees.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use tracing::trace;

// ---------------------------------------------------------------------------
// ComponentType
// ---------------------------------------------------------------------------

/// The kind of deployable unit a component is.
///
/// The derived `Ord` is the scan order: `terraform` before `helmfile`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentType {
    /// A Terraform root module.
    Terraform,
    /// A Helmfile release.
    Helmfile,
}

impl ComponentType {
    /// Every component type, in scan order.
    pub const ALL: [Self; 2] = [Self::Terraform, Self::Helmfile];

    /// The key used for this type under a stack's `components` section.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Terraform => "terraform",
            Self::Helmfile => "helmfile",
        }
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string names no known component type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseComponentTypeError(pub String);

impl fmt::Display for ParseComponentTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown component type '{}': expected 'terraform' or 'helmfile'",
            self.0
        )
    }
}

impl std::error::Error for ParseComponentTypeError {}

impl FromStr for ComponentType {
    type Err = ParseComponentTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "terraform" => Ok(Self::Terraform),
            "helmfile" => Ok(Self::Helmfile),
            other => Err(ParseComponentTypeError(other.to_owned())),
        }
    }
}

// ---------------------------------------------------------------------------
// Section
// ---------------------------------------------------------------------------

/// A mergeable sub-section of a component configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Section {
    Metadata,
    Vars,
    Env,
    Settings,
}

impl Section {
    /// The YAML key of this section.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Metadata => "metadata",
            Self::Vars => "vars",
            Self::Env => "env",
            Self::Settings => "settings",
        }
    }
}

// ---------------------------------------------------------------------------
// ComponentConfig
// ---------------------------------------------------------------------------

/// The fully merged configuration of one component in one stack.
///
/// Sections that are absent, or present but not a mapping, are `None`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ComponentConfig {
    pub metadata: Option<Mapping>,
    pub vars: Option<Mapping>,
    pub env: Option<Mapping>,
    pub settings: Option<Mapping>,
    /// Folder of the component's source, relative to the component-type base path.
    pub component: Option<String>,
}

impl ComponentConfig {
    /// Read a component from a loader-produced value.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        let Some(map) = value.as_mapping() else {
            return Self::default();
        };
        let section = |key: &str| map.get(key).and_then(Value::as_mapping).cloned();
        Self {
            metadata: section(Section::Metadata.key()),
            vars: section(Section::Vars.key()),
            env: section(Section::Env.key()),
            settings: section(Section::Settings.key()),
            component: map
                .get("component")
                .and_then(Value::as_str)
                .map(str::to_owned),
        }
    }

    /// Borrow one section.
    #[must_use]
    pub const fn section(&self, section: Section) -> Option<&Mapping> {
        match section {
            Section::Metadata => self.metadata.as_ref(),
            Section::Vars => self.vars.as_ref(),
            Section::Env => self.env.as_ref(),
            Section::Settings => self.settings.as_ref(),
        }
    }

    /// `true` when `metadata.type` is `abstract`.
    #[must_use]
    pub fn is_abstract(&self) -> bool {
        self.metadata
            .as_ref()
            .and_then(|m| m.get("type"))
            .and_then(Value::as_str)
            == Some("abstract")
    }

    /// The declared component folder, if non-empty.
    #[must_use]
    pub fn folder(&self) -> Option<&str> {
        self.component.as_deref().filter(|c| !c.is_empty())
    }
}

// ---------------------------------------------------------------------------
// StackTree
// ---------------------------------------------------------------------------

/// All components of one stack, grouped by type.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StackTree {
    pub components: BTreeMap<ComponentType, BTreeMap<String, ComponentConfig>>,
}

impl StackTree {
    /// Parse a stack from `{components: {terraform: {..}, helmfile: {..}}}`.
    ///
    /// Unknown component types are ignored.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        let mut components = BTreeMap::new();
        let Some(sections) = value.get("components").and_then(Value::as_mapping) else {
            return Self { components };
        };
        for (key, entries) in sections {
            let Some(ty) = key.as_str().and_then(|k| k.parse::<ComponentType>().ok()) else {
                trace!(?key, "ignoring unknown component type");
                continue;
            };
            let Some(entries) = entries.as_mapping() else {
                continue;
            };
            let parsed: BTreeMap<String, ComponentConfig> = entries
                .iter()
                .filter_map(|(name, cfg)| {
                    name.as_str()
                        .map(|n| (n.to_owned(), ComponentConfig::from_value(cfg)))
                })
                .collect();
            components.insert(ty, parsed);
        }
        Self { components }
    }

    /// Look up a component by type and name.
    #[must_use]
    pub fn component(&self, ty: ComponentType, name: &str) -> Option<&ComponentConfig> {
        self.components.get(&ty).and_then(|c| c.get(name))
    }
}

/// Stack name to stack tree.
pub type Stacks = BTreeMap<String, StackTree>;

/// Parse raw loader output into typed stacks.
#[must_use]
pub fn parse_stacks(raw: &BTreeMap<String, Value>) -> Stacks {
    raw.iter()
        .map(|(name, value)| (name.clone(), StackTree::from_value(value)))
        .collect()
}

/// Look up a component across all stacks.
#[must_use]
pub fn find_component<'a>(
    stacks: &'a Stacks,
    stack: &str,
    ty: ComponentType,
    name: &str,
) -> Option<&'a ComponentConfig> {
    stacks.get(stack).and_then(|s| s.component(ty, name))
}

//! Stackscope configuration (`stackscope.toml`).
//!
//! Describes where stacks and component sources live inside the repository,
//! how list values merge while stacks are resolved, and the naming inputs for
//! derived identifiers.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use stackscope_core::{AtlantisProjectTemplate, ComponentLayout, ContextNaming, MergeOptions};

/// Environment variable that overrides [`StackscopeConfig::base_path`].
pub const BASE_PATH_ENV: &str = "STACKSCOPE_BASE_PATH";

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "stackscope.toml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level configuration.
///
/// Missing file → all defaults (no error).
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StackscopeConfig {
    /// Prefix for every other path, relative to the repository root.
    /// May be absolute as long as it lies inside the repository.
    #[serde(default)]
    pub base_path: String,

    #[serde(default)]
    pub components: ComponentsConfig,

    #[serde(default)]
    pub stacks: StacksConfig,

    #[serde(default)]
    pub integrations: IntegrationsConfig,
}

// ---------------------------------------------------------------------------
// Components
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComponentsConfig {
    #[serde(default = "default_terraform")]
    pub terraform: ComponentTypeConfig,
    #[serde(default = "default_helmfile")]
    pub helmfile: ComponentTypeConfig,
}

impl Default for ComponentsConfig {
    fn default() -> Self {
        Self {
            terraform: default_terraform(),
            helmfile: default_helmfile(),
        }
    }
}

/// Settings for one component type.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComponentTypeConfig {
    /// Folder holding this type's component sources, under `base_path`.
    pub base_path: String,
}

fn default_terraform() -> ComponentTypeConfig {
    ComponentTypeConfig {
        base_path: "components/terraform".to_owned(),
    }
}

fn default_helmfile() -> ComponentTypeConfig {
    ComponentTypeConfig {
        base_path: "components/helmfile".to_owned(),
    }
}

// ---------------------------------------------------------------------------
// Stacks
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StacksConfig {
    /// Folder holding stack manifests, under `base_path`.
    #[serde(default = "default_stacks_base")]
    pub base_path: String,

    /// Globs (relative to the stacks folder) selecting top-level stack files.
    #[serde(default = "default_included")]
    pub included_paths: Vec<String>,

    /// Globs excluded from `included_paths`, typically import-only catalogs.
    #[serde(default = "default_excluded")]
    pub excluded_paths: Vec<String>,

    /// Spacelift stack prefix pattern, e.g. `{tenant}-{environment}-{stage}`.
    /// Empty uses the stack name.
    #[serde(default)]
    pub name_pattern: String,

    #[serde(default)]
    pub list_merge_strategy: ListMergeStrategy,
}

impl Default for StacksConfig {
    fn default() -> Self {
        Self {
            base_path: default_stacks_base(),
            included_paths: default_included(),
            excluded_paths: default_excluded(),
            name_pattern: String::new(),
            list_merge_strategy: ListMergeStrategy::default(),
        }
    }
}

fn default_stacks_base() -> String {
    "stacks".to_owned()
}

fn default_included() -> Vec<String> {
    vec!["**/*.yaml".to_owned()]
}

fn default_excluded() -> Vec<String> {
    vec!["**/_defaults.yaml".to_owned()]
}

/// How lists combine when stack layers are deep-merged.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListMergeStrategy {
    /// Later lists replace earlier ones.
    #[default]
    Replace,
    /// Later lists are appended.
    Append,
    /// Lists merge element by element over their common prefix.
    Merge,
}

impl ListMergeStrategy {
    #[must_use]
    pub const fn merge_options(self) -> MergeOptions {
        MergeOptions {
            append_slice: matches!(self, Self::Append),
            slice_deep_copy: matches!(self, Self::Merge),
        }
    }
}

impl fmt::Display for ListMergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Replace => write!(f, "replace"),
            Self::Append => write!(f, "append"),
            Self::Merge => write!(f, "merge"),
        }
    }
}

// ---------------------------------------------------------------------------
// Integrations
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IntegrationsConfig {
    #[serde(default)]
    pub atlantis: AtlantisConfig,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AtlantisConfig {
    /// Named project templates, selected per component with
    /// `settings.atlantis.project_template_name`.
    #[serde(default)]
    pub project_templates: BTreeMap<String, AtlantisProjectTemplate>,
}

// ---------------------------------------------------------------------------
// Derived values
// ---------------------------------------------------------------------------

impl StackscopeConfig {
    /// Component folders as configured. `base_path` is used verbatim here;
    /// see [`crate::stacks::ResolutionContext::layout`] for the
    /// repository-relative form.
    #[must_use]
    pub fn layout(&self) -> ComponentLayout {
        ComponentLayout::new(
            &self.base_path,
            &self.components.terraform.base_path,
            &self.components.helmfile.base_path,
        )
    }

    /// The default identifier deriver for this configuration.
    #[must_use]
    pub fn naming(&self, layout: ComponentLayout) -> ContextNaming {
        ContextNaming {
            stack_name_pattern: Some(self.stacks.name_pattern.clone()).filter(|p| !p.is_empty()),
            atlantis_templates: self.integrations.atlantis.project_templates.clone(),
            layout,
        }
    }

    #[must_use]
    pub const fn merge_options(&self) -> MergeOptions {
        self.stacks.list_merge_strategy.merge_options()
    }

    /// Apply `STACKSCOPE_BASE_PATH` from the process environment.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`, which maps variable names to values.
    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(base) = lookup(BASE_PATH_ENV) {
            self.base_path = base;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Error loading a configuration file.
#[derive(Debug)]
pub struct ConfigError {
    /// The path that was being loaded (if available).
    pub path: Option<PathBuf>,
    /// Human-readable message with line-level detail when possible.
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(p) = &self.path {
            write!(f, "{}: {}", p.display(), self.message)
        } else {
            write!(f, "config error: {}", self.message)
        }
    }
}

impl std::error::Error for ConfigError {}

impl StackscopeConfig {
    /// Load configuration from a TOML file.
    ///
    /// - If the file does not exist, returns all defaults (not an error).
    /// - If the file exists but contains invalid TOML or unknown fields,
    ///   returns a [`ConfigError`] with line-level detail.
    ///
    /// # Errors
    /// Returns `ConfigError` on I/O errors (other than not-found) or parse errors.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(ConfigError {
                    path: Some(path.to_owned()),
                    message: format!("could not read file: {e}"),
                });
            }
        };
        Self::parse(&contents).map_err(|mut e| {
            e.path = Some(path.to_owned());
            e
        })
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `ConfigError` on invalid TOML or unknown fields.
    pub fn parse(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| {
            let mut message = e.message().to_owned();
            if let Some(span) = e.span() {
                let line = toml_str[..span.start]
                    .chars()
                    .filter(|&c| c == '\n')
                    .count()
                    + 1;
                message = format!("line {line}: {message}");
            }
            ConfigError {
                path: None,
                message,
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

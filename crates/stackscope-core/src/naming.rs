//! Derived identifiers for external systems.
//!
//! Affected records carry three names that other tools key on: the Spacelift
//! stack, the Atlantis project, and the on-disk component path. How those are
//! built is a policy of the surrounding project, so the enricher only sees
//! the [`IdentifierDeriver`] trait. [`ContextNaming`] is the default policy:
//! names are rendered from `{token}` templates filled in from the
//! component's `vars`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use thiserror::Error;

use crate::layout::ComponentLayout;
use crate::model::{ComponentConfig, ComponentType};

/// Errors from identifier derivation.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum NamingError {
    /// The pattern references a context token the component's vars lack.
    #[error("stack name pattern '{pattern}' needs `{token}` but stack '{stack}' does not define it in vars")]
    MissingContext {
        pattern: String,
        token: String,
        stack: String,
    },
    /// The pattern references a token that is not a context token.
    #[error("unknown token `{{{token}}}` in pattern '{pattern}'")]
    UnknownToken { pattern: String, token: String },
    /// The pattern has an unterminated `{`.
    #[error("invalid pattern '{0}': unterminated '{{'")]
    InvalidTemplate(String),
    /// `settings.atlantis.project_template_name` names no configured template.
    #[error("atlantis project template '{0}' is not configured")]
    UnknownTemplate(String),
}

/// Builds the derived identifiers of an affected record.
pub trait IdentifierDeriver {
    /// The Spacelift stack name, or an empty string when Spacelift is not
    /// enabled for the component.
    ///
    /// # Errors
    /// Implementation specific; aborts enrichment.
    fn spacelift_stack_name(
        &self,
        component: &str,
        stack: &str,
        settings: &Mapping,
        vars: &Mapping,
    ) -> Result<String, NamingError>;

    /// The Atlantis project name, or an empty string when none is configured.
    ///
    /// # Errors
    /// Implementation specific; aborts enrichment.
    fn atlantis_project_name(
        &self,
        component: &str,
        settings: &Mapping,
        vars: &Mapping,
    ) -> Result<String, NamingError>;

    /// Repository-relative path of the component's source folder.
    fn component_path(&self, config: &ComponentConfig, ty: ComponentType) -> String;
}

/// An Atlantis project template from configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtlantisProjectTemplate {
    /// Project name pattern, e.g. `{tenant}-{environment}-{stage}-{component}`.
    #[serde(default)]
    pub name: String,
}

/// Template-driven naming from component vars.
#[derive(Clone, Debug, Default)]
pub struct ContextNaming {
    /// Spacelift stack prefix pattern. `None` uses the stack name.
    pub stack_name_pattern: Option<String>,
    pub atlantis_templates: BTreeMap<String, AtlantisProjectTemplate>,
    pub layout: ComponentLayout,
}

impl ContextNaming {
    #[must_use]
    pub fn new(layout: ComponentLayout) -> Self {
        Self {
            layout,
            ..Self::default()
        }
    }
}

const CONTEXT_TOKENS: [&str; 6] = [
    "namespace",
    "tenant",
    "environment",
    "stage",
    "region",
    "component",
];

/// Token values for one component.
struct NameContext(BTreeMap<&'static str, String>);

impl NameContext {
    fn from_vars(component: &str, vars: &Mapping) -> Self {
        let mut values = BTreeMap::new();
        for token in CONTEXT_TOKENS {
            if let Some(v) = vars.get(token).and_then(scalar_string) {
                values.insert(token, v);
            }
        }
        values.insert("component", component.replace('/', "-"));
        Self(values)
    }

    fn get(&self, token: &str) -> Option<&str> {
        self.0.get(token).map(String::as_str)
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Render `{token}` placeholders.
///
/// Strict mode fails on unknown or unset tokens and on an unterminated `{`.
/// Lenient mode leaves anything it cannot fill in as written.
fn render(
    pattern: &str,
    ctx: &NameContext,
    strict: bool,
    stack: &str,
) -> Result<String, NamingError> {
    let mut out = String::with_capacity(pattern.len());
    let mut rest = pattern;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            if strict {
                return Err(NamingError::InvalidTemplate(pattern.to_owned()));
            }
            out.push_str(&rest[open..]);
            return Ok(out);
        };
        let token = &after[..close];
        match ctx.get(token) {
            Some(value) => out.push_str(value),
            None if !strict => {
                out.push('{');
                out.push_str(token);
                out.push('}');
            }
            None if CONTEXT_TOKENS.contains(&token) => {
                return Err(NamingError::MissingContext {
                    pattern: pattern.to_owned(),
                    token: token.to_owned(),
                    stack: stack.to_owned(),
                });
            }
            None => {
                return Err(NamingError::UnknownToken {
                    pattern: pattern.to_owned(),
                    token: token.to_owned(),
                });
            }
        }
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

fn lookup<'a>(map: &'a Mapping, path: &[&str]) -> Option<&'a Value> {
    let (first, tail) = path.split_first()?;
    let value = map.get(*first)?;
    if tail.is_empty() {
        Some(value)
    } else {
        lookup(value.as_mapping()?, tail)
    }
}

impl IdentifierDeriver for ContextNaming {
    fn spacelift_stack_name(
        &self,
        component: &str,
        stack: &str,
        settings: &Mapping,
        vars: &Mapping,
    ) -> Result<String, NamingError> {
        let enabled = lookup(settings, &["spacelift", "workspace_enabled"])
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if !enabled {
            return Ok(String::new());
        }
        let prefix = match self.stack_name_pattern.as_deref().filter(|p| !p.is_empty()) {
            Some(pattern) => render(pattern, &NameContext::from_vars(component, vars), true, stack)?,
            None => stack.replace('/', "-"),
        };
        Ok(format!("{prefix}-{}", component.replace('/', "-")))
    }

    fn atlantis_project_name(
        &self,
        component: &str,
        settings: &Mapping,
        vars: &Mapping,
    ) -> Result<String, NamingError> {
        let inline = lookup(settings, &["atlantis", "project_template", "name"]).and_then(Value::as_str);
        let pattern = match inline {
            Some(name) => name.to_owned(),
            None => {
                let Some(template) =
                    lookup(settings, &["atlantis", "project_template_name"]).and_then(Value::as_str)
                else {
                    return Ok(String::new());
                };
                self.atlantis_templates
                    .get(template)
                    .ok_or_else(|| NamingError::UnknownTemplate(template.to_owned()))?
                    .name
                    .clone()
            }
        };
        render(&pattern, &NameContext::from_vars(component, vars), false, "")
    }

    fn component_path(&self, config: &ComponentConfig, ty: ComponentType) -> String {
        config
            .folder()
            .map(|folder| {
                self.layout
                    .component_folder(ty, folder)
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .unwrap_or_default()
    }
}

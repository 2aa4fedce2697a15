//! Affected-component scanner.
//!
//! Every non-abstract component of every current stack is checked against
//! the same component in the remote stacks. The checks form an ordered list,
//! [`CRITERIA`]; the first one that matches decides the reason and the rest
//! are skipped, so a component is reported at most once.
//!
//! Section checks compare by structural equality. A section is compared only
//! when the current component has it. When the remote side lacks the
//! component or the section, the section counts as different. A component
//! missing from the remote is affected even when it has no sections at all.

use tracing::debug;

use crate::layout::ComponentLayout;
use crate::model::{
    AffectedReason, ChangedFiles, ComponentConfig, ComponentType, Section, Stacks,
};

/// One check in the classification chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Criterion {
    /// A section differs from the remote component.
    Section(Section),
    /// A changed file lies inside the component's source folder.
    ComponentFolder,
}

/// Classification order. Earlier entries win.
pub const CRITERIA: [(Criterion, AffectedReason); 5] = [
    (Criterion::Section(Section::Metadata), AffectedReason::StackMetadata),
    (Criterion::ComponentFolder, AffectedReason::Component),
    (Criterion::Section(Section::Vars), AffectedReason::StackVars),
    (Criterion::Section(Section::Env), AffectedReason::StackEnv),
    (Criterion::Section(Section::Settings), AffectedReason::StackSettings),
];

/// Inputs shared by every classification in one scan.
#[derive(Clone, Copy, Debug)]
pub struct ScanContext<'a> {
    pub changed_files: &'a ChangedFiles,
    pub layout: &'a ComponentLayout,
}

/// A component the scanner found affected, before enrichment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate<'a> {
    pub stack: &'a str,
    pub component_type: ComponentType,
    pub component: &'a str,
    pub config: &'a ComponentConfig,
    pub reason: AffectedReason,
}

impl Criterion {
    fn matches(
        self,
        ty: ComponentType,
        current: &ComponentConfig,
        remote: Option<&ComponentConfig>,
        ctx: &ScanContext<'_>,
    ) -> bool {
        match self {
            Self::Section(section) => current.section(section).is_some_and(|local| {
                remote.and_then(|r| r.section(section)) != Some(local)
            }),
            Self::ComponentFolder => current
                .folder()
                .map(|folder| ctx.layout.component_folder(ty, folder))
                .is_some_and(|folder| {
                    // An empty folder would contain every path in the repo.
                    !folder.as_os_str().is_empty() && ctx.changed_files.any_under(&folder)
                }),
        }
    }
}

/// The first criterion `current` meets, or `None` if it is unaffected.
///
/// With no remote component every present section already differs. A
/// component with none of the compared sections and no folder change is
/// still affected when the remote lacks it, under the first criterion's
/// reason.
#[must_use]
pub fn classify(
    ty: ComponentType,
    current: &ComponentConfig,
    remote: Option<&ComponentConfig>,
    ctx: &ScanContext<'_>,
) -> Option<AffectedReason> {
    CRITERIA
        .iter()
        .find(|(criterion, _)| criterion.matches(ty, current, remote, ctx))
        .map(|&(_, reason)| reason)
        .or_else(|| remote.is_none().then_some(CRITERIA[0].1))
}

/// Scan all current stacks against the remote stacks.
///
/// Results are ordered by stack name, then component type (`terraform`
/// first), then component name.
#[must_use]
pub fn find_affected<'a>(
    current: &'a Stacks,
    remote: &Stacks,
    ctx: &ScanContext<'_>,
) -> Vec<Candidate<'a>> {
    let mut out = Vec::new();
    for (stack, tree) in current {
        let remote_tree = remote.get(stack);
        for (&ty, components) in &tree.components {
            for (name, config) in components {
                if config.is_abstract() {
                    continue;
                }
                let remote_config = remote_tree.and_then(|t| t.component(ty, name));
                if let Some(reason) = classify(ty, config, remote_config, ctx) {
                    debug!(stack = %stack, component = %name, component_type = %ty, %reason, "affected");
                    out.push(Candidate {
                        stack,
                        component_type: ty,
                        component: name,
                        config,
                        reason,
                    });
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use serde_yaml::Value;

    use super::*;

    fn cfg(yaml: &str) -> ComponentConfig {
        ComponentConfig::from_value(&serde_yaml::from_str::<Value>(yaml).unwrap())
    }

    fn layout() -> ComponentLayout {
        ComponentLayout::new("", "components/terraform", "components/helmfile")
    }

    fn classify_with(
        current: &ComponentConfig,
        remote: Option<&ComponentConfig>,
        files: &[&str],
    ) -> Option<AffectedReason> {
        let changed: ChangedFiles = files.iter().copied().collect();
        let layout = layout();
        let ctx = ScanContext {
            changed_files: &changed,
            layout: &layout,
        };
        classify(ComponentType::Terraform, current, remote, &ctx)
    }

    #[test]
    fn criteria_order_is_fixed() {
        let reasons: Vec<_> = CRITERIA.iter().map(|(_, r)| *r).collect();
        assert_eq!(
            reasons,
            [
                AffectedReason::StackMetadata,
                AffectedReason::Component,
                AffectedReason::StackVars,
                AffectedReason::StackEnv,
                AffectedReason::StackSettings,
            ]
        );
    }

    #[test]
    fn identical_component_is_unaffected() {
        let c = cfg("metadata: {}\nvars: {a: 1}\nenv: {X: y}\nsettings: {s: 1}\ncomponent: vpc\n");
        assert_eq!(classify_with(&c, Some(&c), &["README.md"]), None);
    }

    #[test]
    fn metadata_beats_vars() {
        let local = cfg("metadata: {owner: a}\nvars: {a: 1}\n");
        let remote = cfg("metadata: {owner: b}\nvars: {a: 2}\n");
        assert_eq!(
            classify_with(&local, Some(&remote), &[]),
            Some(AffectedReason::StackMetadata)
        );
    }

    #[test]
    fn folder_beats_vars() {
        let local = cfg("vars: {a: 1}\ncomponent: vpc\n");
        let remote = cfg("vars: {a: 2}\ncomponent: vpc\n");
        assert_eq!(
            classify_with(&local, Some(&remote), &["components/terraform/vpc/main.tf"]),
            Some(AffectedReason::Component)
        );
    }

    #[test]
    fn folder_change_does_not_leak_to_siblings() {
        let rds = cfg("component: rds\n");
        assert_eq!(
            classify_with(&rds, Some(&rds), &["components/terraform/vpc/main.tf"]),
            None
        );
    }

    #[test]
    fn env_and_settings_in_order() {
        let local = cfg("vars: {a: 1}\nenv: {E: 1}\nsettings: {s: 1}\n");
        let remote = cfg("vars: {a: 1}\nenv: {E: 2}\nsettings: {s: 2}\n");
        assert_eq!(
            classify_with(&local, Some(&remote), &[]),
            Some(AffectedReason::StackEnv)
        );
        let remote = cfg("vars: {a: 1}\nenv: {E: 1}\nsettings: {s: 2}\n");
        assert_eq!(
            classify_with(&local, Some(&remote), &[]),
            Some(AffectedReason::StackSettings)
        );
    }

    #[test]
    fn missing_remote_component_is_affected_at_first_present_section() {
        let local = cfg("vars: {a: 1}\n");
        assert_eq!(classify_with(&local, None, &[]), Some(AffectedReason::StackVars));
        let local = cfg("metadata: {}\nvars: {a: 1}\n");
        assert_eq!(
            classify_with(&local, None, &[]),
            Some(AffectedReason::StackMetadata)
        );
    }

    #[test]
    fn missing_remote_component_without_sections_is_still_affected() {
        let bare = ComponentConfig::default();
        assert_eq!(
            classify_with(&bare, None, &[]),
            Some(AffectedReason::StackMetadata)
        );
        let with_folder = cfg("component: vpc
");
        assert_eq!(
            classify_with(&with_folder, None, &["components/terraform/vpc/main.tf"]),
            Some(AffectedReason::Component)
        );
        assert_eq!(classify_with(&bare, Some(&bare), &[]), None);
    }

    #[test]
    fn empty_component_folder_matches_nothing() {
        let flat = ComponentLayout::new("", "", "");
        let changed: ChangedFiles = ["stacks/dev.yaml", "README.md"].into_iter().collect();
        let ctx = ScanContext {
            changed_files: &changed,
            layout: &flat,
        };
        let here = cfg("component: .
vars: {a: 1}
");
        assert_eq!(classify(ComponentType::Terraform, &here, Some(&here), &ctx), None);
    }

    #[test]
    fn missing_remote_section_counts_as_different() {
        let local = cfg("vars: {a: 1}\nenv: {E: 1}\n");
        let remote = cfg("vars: {a: 1}\n");
        assert_eq!(
            classify_with(&local, Some(&remote), &[]),
            Some(AffectedReason::StackEnv)
        );
    }

    #[test]
    fn find_affected_skips_abstract_and_sorts() {
        let raw = |s: &str| serde_yaml::from_str::<Value>(s).unwrap();
        let mut current_raw = std::collections::BTreeMap::new();
        current_raw.insert(
            "prod".to_owned(),
            raw("components:\n  helmfile:\n    nginx: {vars: {r: 2}}\n  terraform:\n    vpc: {vars: {a: 1}}\n"),
        );
        current_raw.insert(
            "dev".to_owned(),
            raw("components:\n  terraform:\n    base: {metadata: {type: abstract}, vars: {a: 9}}\n    vpc: {vars: {a: 1}}\n"),
        );
        let current = crate::model::parse_stacks(&current_raw);
        let remote = Stacks::new();
        let changed = ChangedFiles::new();
        let layout = layout();
        let ctx = ScanContext {
            changed_files: &changed,
            layout: &layout,
        };
        let found: Vec<_> = find_affected(&current, &remote, &ctx)
            .into_iter()
            .map(|c| (c.stack, c.component_type, c.component))
            .collect();
        assert_eq!(
            found,
            [
                ("dev", ComponentType::Terraform, "vpc"),
                ("prod", ComponentType::Terraform, "vpc"),
                ("prod", ComponentType::Helmfile, "nginx"),
            ]
        );
    }
}

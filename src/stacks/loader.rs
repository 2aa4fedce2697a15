//! Built-in loader for YAML stack manifests.
//!
//! # Manifests
//!
//! A stack is a YAML file under the stacks folder that matches one of the
//! included globs and none of the excluded ones. Its name is its path
//! relative to the stacks folder, without the extension (`orgs/acme/dev`).
//!
//! ```yaml
//! import:
//!   - catalog/vpc          # relative to the stacks folder, `.yaml` optional
//!   - mixins/region/*      # globs expand in sorted order
//! vars: {stage: dev}       # global sections apply to every component
//! terraform:
//!   vars: {backend: s3}    # apply to every terraform component
//! components:
//!   terraform:
//!     vpc:
//!       metadata:
//!         component: vpc   # source folder, under the terraform base path
//!         inherits: [vpc-defaults]
//!       vars: {cidr: 10.0.0.0/16}
//! ```
//!
//! Imports are merged before the importing file, depth first. A file that
//! imports itself, directly or not, is an error.
//!
//! # Components
//!
//! `vars`, `env` and `settings` are merged from: the global section, the
//! component-type section, each base named in `metadata.inherits` (with its
//! own bases first), and finally the component itself. `metadata` belongs to
//! the component alone. The source folder is `metadata.component`, else the
//! `component` attribute, else the nearest base's folder, else the
//! component's name.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use serde_yaml::{Mapping, Value};
use stackscope_core::{ComponentType, MergeOptions, Section, merge_with_options};
use tracing::{debug, trace};

use super::resolve::{LoaderError, RawStacks, ResolutionContext, StackFilter, StackLoader};

const MERGED_SECTIONS: [Section; 3] = [Section::Vars, Section::Env, Section::Settings];

/// Loads stacks from YAML manifests on disk.
#[derive(Clone, Copy, Debug, Default)]
pub struct YamlStackLoader {
    merge_options: MergeOptions,
}

impl YamlStackLoader {
    #[must_use]
    pub const fn new(merge_options: MergeOptions) -> Self {
        Self { merge_options }
    }
}

impl StackLoader for YamlStackLoader {
    fn resolve_stacks(
        &self,
        ctx: &ResolutionContext,
        filter: &StackFilter,
    ) -> Result<RawStacks, LoaderError> {
        let mut stacks = RawStacks::new();
        for (name, path) in stack_files(ctx)? {
            if !filter.matches_stack(&name) {
                continue;
            }
            let doc = self.load_with_imports(ctx.stacks_dir(), &path, &mut Vec::new())?;
            let stack = self.build_stack(&path, &doc, filter)?;
            trace!(stack = %name, "resolved stack");
            stacks.insert(name, stack);
        }
        debug!(
            count = stacks.len(),
            dir = %ctx.stacks_dir().display(),
            target = ctx.is_target_snapshot(),
            "loaded stacks"
        );
        Ok(stacks)
    }
}

// ---------------------------------------------------------------------------
// Stack files
// ---------------------------------------------------------------------------

/// Stack name to manifest path, for every included and not excluded file.
///
/// The target may predate the stacks folder and then has no stacks. The
/// current snapshot must have one.
fn stack_files(ctx: &ResolutionContext) -> Result<BTreeMap<String, PathBuf>, LoaderError> {
    let dir = ctx.stacks_dir();
    if !dir.is_dir() {
        if ctx.is_target_snapshot() {
            debug!(dir = %dir.display(), "target has no stacks folder");
            return Ok(BTreeMap::new());
        }
        return Err(LoaderError::at(dir, "stacks folder not found"));
    }
    let excluded = ctx
        .excluded_paths()
        .iter()
        .map(|p| {
            glob::Pattern::new(p)
                .map_err(|e| LoaderError::new(format!("invalid excluded_paths glob '{p}': {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut files = BTreeMap::new();
    for pattern in ctx.included_paths() {
        for path in expand_glob(dir, pattern)? {
            let Ok(rel) = path.strip_prefix(dir) else {
                continue;
            };
            if excluded.iter().any(|p| p.matches_path(rel)) {
                continue;
            }
            files.insert(stack_name(rel), path);
        }
    }
    Ok(files)
}

/// Files under `dir` matching `pattern`, sorted.
fn expand_glob(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>, LoaderError> {
    let full = format!(
        "{}/{pattern}",
        glob::Pattern::escape(&dir.to_string_lossy())
    );
    let entries = glob::glob(&full)
        .map_err(|e| LoaderError::new(format!("invalid glob '{pattern}': {e}")))?;
    let mut paths = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| LoaderError::at(e.path(), e.error().to_string()))?;
        if path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

fn stack_name(rel: &Path) -> String {
    rel.with_extension("")
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

// ---------------------------------------------------------------------------
// Imports
// ---------------------------------------------------------------------------

impl YamlStackLoader {
    fn load_with_imports(
        &self,
        stacks_dir: &Path,
        path: &Path,
        chain: &mut Vec<PathBuf>,
    ) -> Result<Mapping, LoaderError> {
        let identity = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        if chain.contains(&identity) {
            let cycle: Vec<String> = chain
                .iter()
                .chain(std::iter::once(&identity))
                .map(|p| p.display().to_string())
                .collect();
            return Err(LoaderError::at(
                path,
                format!("import cycle: {}", cycle.join(" -> ")),
            ));
        }

        let mut doc = read_manifest(path)?;
        let imports = match doc.remove("import") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::String(s)) => vec![s],
            Some(Value::Sequence(items)) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s),
                    other => Err(LoaderError::at(
                        path,
                        format!("import entries must be strings, got {other:?}"),
                    )),
                })
                .collect::<Result<_, _>>()?,
            Some(other) => {
                return Err(LoaderError::at(
                    path,
                    format!("`import` must be a list of paths, got {other:?}"),
                ));
            }
        };

        chain.push(identity);
        let mut layers = Vec::with_capacity(imports.len() + 1);
        for import in &imports {
            for target in resolve_import(stacks_dir, path, import)? {
                layers.push(self.load_with_imports(stacks_dir, &target, chain)?);
            }
        }
        chain.pop();

        layers.push(doc);
        merge_with_options(&layers, self.merge_options)
            .map_err(|e| LoaderError::at(path, e.to_string()))
    }
}

fn read_manifest(path: &Path) -> Result<Mapping, LoaderError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| LoaderError::at(path, format!("cannot read manifest: {e}")))?;
    match serde_yaml::from_str::<Value>(&text) {
        Ok(Value::Mapping(map)) => Ok(map),
        Ok(Value::Null) => Ok(Mapping::new()),
        Ok(_) => Err(LoaderError::at(path, "top level must be a mapping")),
        Err(e) => Err(LoaderError::at(path, format!("invalid YAML: {e}"))),
    }
}

fn resolve_import(
    stacks_dir: &Path,
    importer: &Path,
    import: &str,
) -> Result<Vec<PathBuf>, LoaderError> {
    if import.contains(['*', '?', '[']) {
        let pattern = if Path::new(import).extension().is_some() {
            import.to_owned()
        } else {
            format!("{import}.yaml")
        };
        let matches = expand_glob(stacks_dir, &pattern)?;
        if matches.is_empty() {
            return Err(LoaderError::at(
                importer,
                format!("import '{import}' matched no files"),
            ));
        }
        return Ok(matches);
    }
    let mut target = stacks_dir.join(import);
    if target.extension().is_none() {
        target.set_extension("yaml");
    }
    if !target.is_file() {
        return Err(LoaderError::at(
            importer,
            format!("import '{import}' not found at {}", target.display()),
        ));
    }
    Ok(vec![target])
}

// ---------------------------------------------------------------------------
// Components
// ---------------------------------------------------------------------------

fn mapping_at<'a>(map: &'a Mapping, key: &str) -> Option<&'a Mapping> {
    map.get(key).and_then(Value::as_mapping)
}

fn metadata_str<'a>(component: &'a Mapping, key: &str) -> Option<&'a str> {
    mapping_at(component, "metadata")
        .and_then(|m| m.get(key))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// Bases of `name` in merge order: each base's own bases precede it.
fn inheritance_chain<'a>(
    components: &'a Mapping,
    name: &str,
    visiting: &mut Vec<String>,
    out: &mut Vec<&'a Mapping>,
) -> Result<(), String> {
    if visiting.iter().any(|v| v == name) {
        visiting.push(name.to_owned());
        return Err(format!("inheritance cycle: {}", visiting.join(" -> ")));
    }
    let component = mapping_at(components, name)
        .ok_or_else(|| format!("inherits from unknown component '{name}'"))?;
    let Some(inherits) = mapping_at(component, "metadata")
        .and_then(|m| m.get("inherits"))
        .and_then(Value::as_sequence)
    else {
        return Ok(());
    };
    visiting.push(name.to_owned());
    for base in inherits.iter().filter_map(Value::as_str) {
        inheritance_chain(components, base, visiting, out)?;
        if let Some(base_map) = mapping_at(components, base) {
            out.push(base_map);
        }
    }
    visiting.pop();
    Ok(())
}

impl YamlStackLoader {
    fn build_stack(
        &self,
        path: &Path,
        doc: &Mapping,
        filter: &StackFilter,
    ) -> Result<Value, LoaderError> {
        let empty = Mapping::new();
        let mut by_type = Mapping::new();

        for ty in ComponentType::ALL {
            let type_level = mapping_at(doc, ty.as_str()).unwrap_or(&empty);
            let components = mapping_at(doc, "components")
                .and_then(|c| mapping_at(c, ty.as_str()))
                .unwrap_or(&empty);

            let mut resolved = Mapping::new();
            for (key, value) in components {
                let Some(name) = key.as_str() else {
                    continue;
                };
                if !filter.matches_component(ty, name) {
                    continue;
                }
                let own = value.as_mapping().unwrap_or(&empty);
                let mut bases = Vec::new();
                inheritance_chain(components, name, &mut Vec::new(), &mut bases).map_err(|e| {
                    LoaderError::at(path, format!("{ty} component '{name}': {e}"))
                })?;

                let mut out = Mapping::new();
                let folder = metadata_str(own, "component")
                    .or_else(|| own.get("component").and_then(Value::as_str))
                    .or_else(|| {
                        bases.iter().rev().find_map(|b| {
                            metadata_str(b, "component")
                                .or_else(|| b.get("component").and_then(Value::as_str))
                        })
                    })
                    .unwrap_or(name);
                out.insert("component".into(), folder.into());
                if let Some(metadata) = mapping_at(own, "metadata") {
                    out.insert("metadata".into(), Value::Mapping(metadata.clone()));
                }
                for section in MERGED_SECTIONS {
                    let key = section.key();
                    let mut layers = vec![
                        mapping_at(doc, key).cloned().unwrap_or_default(),
                        mapping_at(type_level, key).cloned().unwrap_or_default(),
                    ];
                    layers.extend(bases.iter().map(|b| mapping_at(b, key).cloned().unwrap_or_default()));
                    layers.push(mapping_at(own, key).cloned().unwrap_or_default());
                    let merged = merge_with_options(&layers, self.merge_options).map_err(|e| {
                        LoaderError::at(path, format!("{ty} component '{name}': {e}"))
                    })?;
                    out.insert(key.into(), Value::Mapping(merged));
                }
                resolved.insert(name.into(), Value::Mapping(out));
            }
            by_type.insert(ty.as_str().into(), Value::Mapping(resolved));
        }

        let mut stack = Mapping::new();
        stack.insert("components".into(), Value::Mapping(by_type));
        Ok(Value::Mapping(stack))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StackscopeConfig;
    use stackscope_core::parse_stacks;

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    fn load(root: &Path, filter: &StackFilter) -> Result<RawStacks, LoaderError> {
        let ctx = ResolutionContext::current(&StackscopeConfig::default(), root).unwrap();
        YamlStackLoader::default().resolve_stacks(&ctx, filter)
    }

    fn component<'a>(stacks: &'a RawStacks, stack: &str, ty: &str, name: &str) -> &'a Value {
        &stacks[stack]["components"][ty][name]
    }

    #[test]
    fn names_come_from_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "stacks/orgs/acme/dev.yaml", "vars: {}\n");
        write(dir.path(), "stacks/orgs/acme/_defaults.yaml", "vars: {}\n");
        write(dir.path(), "stacks/README.md", "not a stack\n");
        let stacks = load(dir.path(), &StackFilter::default()).unwrap();
        assert_eq!(stacks.keys().collect::<Vec<_>>(), ["orgs/acme/dev"]);
    }

    #[test]
    fn missing_stacks_dir_is_an_error_only_locally() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(dir.path(), &StackFilter::default()).unwrap_err();
        assert!(err.message.contains("stacks folder not found"), "got: {err}");

        let target = tempfile::tempdir().unwrap();
        let ctx = ResolutionContext::target(
            &StackscopeConfig::default(),
            dir.path(),
            target.path(),
        )
        .unwrap();
        let stacks = YamlStackLoader::default()
            .resolve_stacks(&ctx, &StackFilter::default())
            .unwrap();
        assert!(stacks.is_empty());
    }

    #[test]
    fn imports_merge_before_the_stack() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "stacks/catalog/vpc.yaml",
            "components:\n  terraform:\n    vpc:\n      vars: {cidr: 10.0.0.0/8, nat: true}\n",
        );
        write(
            dir.path(),
            "stacks/dev.yaml",
            "import: [catalog/vpc]\nvars: {stage: dev}\ncomponents:\n  terraform:\n    vpc:\n      vars: {cidr: 10.1.0.0/16}\n",
        );
        let filter = StackFilter {
            stack: Some("dev".into()),
            ..StackFilter::default()
        };
        let stacks = load(dir.path(), &filter).unwrap();
        let vpc = component(&stacks, "dev", "terraform", "vpc");
        assert_eq!(vpc["vars"]["cidr"], Value::from("10.1.0.0/16"));
        assert_eq!(vpc["vars"]["nat"], Value::from(true));
        assert_eq!(vpc["vars"]["stage"], Value::from("dev"));
        assert_eq!(vpc["component"], Value::from("vpc"));
    }

    #[test]
    fn import_cycles_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "stacks/catalog/a.yaml", "import: [catalog/b]\n");
        write(dir.path(), "stacks/catalog/b.yaml", "import: [catalog/a]\n");
        write(dir.path(), "stacks/dev.yaml", "import: [catalog/a]\n");
        let config = StackscopeConfig {
            stacks: crate::config::StacksConfig {
                included_paths: vec!["dev.yaml".into()],
                ..crate::config::StacksConfig::default()
            },
            ..StackscopeConfig::default()
        };
        let ctx = ResolutionContext::current(&config, dir.path()).unwrap();
        let err = YamlStackLoader::default()
            .resolve_stacks(&ctx, &StackFilter::default())
            .unwrap_err();
        assert!(err.message.contains("import cycle"), "got: {err}");
    }

    #[test]
    fn missing_import_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "stacks/dev.yaml", "import: [catalog/nope]\n");
        let err = load(dir.path(), &StackFilter::default()).unwrap_err();
        assert!(err.message.contains("catalog/nope"), "got: {err}");
    }

    #[test]
    fn glob_imports_expand_in_order() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "stacks/mixins/a.yaml", "vars: {order: a, a: 1}\n");
        write(dir.path(), "stacks/mixins/b.yaml", "vars: {order: b}\n");
        write(
            dir.path(),
            "stacks/dev.yaml",
            "import: ['mixins/*']\ncomponents:\n  helmfile:\n    nginx: {}\n",
        );
        let filter = StackFilter {
            stack: Some("dev".into()),
            ..StackFilter::default()
        };
        let stacks = load(dir.path(), &filter).unwrap();
        let nginx = component(&stacks, "dev", "helmfile", "nginx");
        assert_eq!(nginx["vars"]["order"], Value::from("b"));
        assert_eq!(nginx["vars"]["a"], Value::from(1));
    }

    #[test]
    fn inheritance_order_and_metadata() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "stacks/dev.yaml",
            r"
vars: {level: global, g: 1}
terraform:
  vars: {level: type, t: 1}
components:
  terraform:
    base:
      metadata: {type: abstract, component: vpc}
      vars: {level: base, b: 1}
    vpc:
      metadata:
        inherits: [base]
      vars: {level: own}
",
        );
        let stacks = load(dir.path(), &StackFilter::default()).unwrap();
        let vpc = component(&stacks, "dev", "terraform", "vpc");
        assert_eq!(vpc["vars"]["level"], Value::from("own"));
        assert_eq!(vpc["vars"]["g"], Value::from(1));
        assert_eq!(vpc["vars"]["t"], Value::from(1));
        assert_eq!(vpc["vars"]["b"], Value::from(1));
        assert_eq!(vpc["component"], Value::from("vpc"));
        assert!(vpc["metadata"].get("type").is_none());

        let typed = parse_stacks(&stacks);
        let base = typed["dev"]
            .component(ComponentType::Terraform, "base")
            .unwrap();
        assert!(base.is_abstract());
    }

    #[test]
    fn inheritance_cycles_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "stacks/dev.yaml",
            "components:\n  terraform:\n    a: {metadata: {inherits: [b]}}\n    b: {metadata: {inherits: [a]}}\n",
        );
        let err = load(dir.path(), &StackFilter::default()).unwrap_err();
        assert!(err.message.contains("inheritance cycle"), "got: {err}");
    }

    #[test]
    fn component_filter_applies() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "stacks/dev.yaml",
            "components:\n  terraform:\n    vpc: {}\n    rds: {}\n  helmfile:\n    nginx: {}\n",
        );
        let filter = StackFilter {
            components: vec!["vpc".into()],
            ..StackFilter::default()
        };
        let stacks = load(dir.path(), &filter).unwrap();
        let terraform = stacks["dev"]["components"]["terraform"].as_mapping().unwrap();
        assert_eq!(terraform.len(), 1);
        assert!(stacks["dev"]["components"]["helmfile"].as_mapping().unwrap().is_empty());
    }

    #[test]
    fn append_strategy_concatenates_lists() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "stacks/dev.yaml",
            "vars: {zones: [a]}\ncomponents:\n  terraform:\n    vpc: {vars: {zones: [b]}}\n",
        );
        let ctx = ResolutionContext::current(&StackscopeConfig::default(), dir.path()).unwrap();
        let loader = YamlStackLoader::new(MergeOptions {
            append_slice: true,
            slice_deep_copy: false,
        });
        let stacks = loader.resolve_stacks(&ctx, &StackFilter::default()).unwrap();
        let zones = &component(&stacks, "dev", "terraform", "vpc")["vars"]["zones"];
        assert_eq!(zones, &serde_yaml::from_str::<Value>("[a, b]").unwrap());
    }
}

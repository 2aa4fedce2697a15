//! Deep merge of ordered YAML mappings.
//!
//! Stack configuration is layered: globals, then component-type defaults,
//! then inherited base components, then the component itself. Each layer is
//! a [`Mapping`]; [`merge_with_options`] folds them left to right into a new
//! mapping so later layers win.
//!
//! # Rules
//!
//! - Mappings merge recursively, key by key.
//! - A `null` source value never overrides an existing value; it only fills
//!   a key the destination does not have yet.
//! - Scalars, and values of different kinds, are replaced by the source.
//! - Sequences are replaced by default. [`MergeOptions::append_slice`]
//!   appends source items instead. [`MergeOptions::slice_deep_copy`] merges
//!   the common prefix element by element and keeps the destination length.
//!   With either option, a sequence meeting a non-sequence is an error.
//!
//! Inputs are only ever borrowed. The result is built from clones, so no
//! later merge step can reach back into an earlier input through a shared
//! sub-structure.

use serde_yaml::{Mapping, Value};
use thiserror::Error;

/// How sequences combine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MergeOptions {
    /// Append source sequence items after the destination's.
    pub append_slice: bool,
    /// Merge sequences element-wise over their common prefix.
    pub slice_deep_copy: bool,
}

impl MergeOptions {
    const fn slice_aware(self) -> bool {
        self.append_slice || self.slice_deep_copy
    }
}

/// Errors from [`merge_with_options`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum MergeError {
    /// A sequence met a non-sequence while a slice option was enabled.
    #[error("cannot merge {src} into {dst} at `{path}`")]
    KindMismatch {
        /// Dotted path to the offending key.
        path: String,
        /// Kind of the existing value.
        dst: &'static str,
        /// Kind of the incoming value.
        src: &'static str,
    },
}

/// Merge `inputs` with default options (sequences are replaced).
///
/// # Errors
/// Never fails with default options; the `Result` mirrors
/// [`merge_with_options`].
pub fn merge(inputs: &[Mapping]) -> Result<Mapping, MergeError> {
    merge_with_options(inputs, MergeOptions::default())
}

/// Fold `inputs` left to right into a fresh mapping. Empty inputs are skipped.
///
/// # Errors
/// [`MergeError::KindMismatch`] when a slice option is enabled and a sequence
/// meets a value of another kind.
pub fn merge_with_options(inputs: &[Mapping], options: MergeOptions) -> Result<Mapping, MergeError> {
    let mut merged = Mapping::new();
    let mut path = Vec::new();
    for input in inputs.iter().filter(|m| !m.is_empty()) {
        merge_mapping(&mut merged, input, options, &mut path)?;
    }
    Ok(merged)
}

fn merge_mapping(
    dst: &mut Mapping,
    src: &Mapping,
    options: MergeOptions,
    path: &mut Vec<String>,
) -> Result<(), MergeError> {
    for (key, value) in src {
        path.push(key_label(key));
        match dst.get_mut(key) {
            Some(existing) => merge_value(existing, value, options, path)?,
            None => {
                dst.insert(key.clone(), value.clone());
            }
        }
        path.pop();
    }
    Ok(())
}

fn merge_value(
    dst: &mut Value,
    src: &Value,
    options: MergeOptions,
    path: &mut Vec<String>,
) -> Result<(), MergeError> {
    match (dst, src) {
        (_, Value::Null) => Ok(()),
        (Value::Mapping(d), Value::Mapping(s)) => merge_mapping(d, s, options, path),
        (Value::Sequence(d), Value::Sequence(s)) => {
            if options.append_slice {
                d.extend(s.iter().cloned());
            } else if options.slice_deep_copy {
                for (index, (de, se)) in d.iter_mut().zip(s).enumerate() {
                    path.push(format!("[{index}]"));
                    merge_value(de, se, options, path)?;
                    path.pop();
                }
            } else {
                d.clone_from(s);
            }
            Ok(())
        }
        (d, s) => {
            if options.slice_aware() && (d.is_sequence() || s.is_sequence()) {
                return Err(MergeError::KindMismatch {
                    path: path.join("."),
                    dst: kind(d),
                    src: kind(s),
                });
            }
            d.clone_from(s);
            Ok(())
        }
    }
}

fn key_label(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_owned())
            .unwrap_or_else(|_| "?".to_owned()),
    }
}

const fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(src: &str) -> Mapping {
        serde_yaml::from_str(src).unwrap()
    }

    #[test]
    fn later_input_overrides() {
        let merged = merge(&[yaml("a: 1"), yaml("a: 2\nb: 3")]).unwrap();
        assert_eq!(merged, yaml("a: 2\nb: 3"));
    }

    #[test]
    fn append_slice_concatenates() {
        let options = MergeOptions {
            append_slice: true,
            ..MergeOptions::default()
        };
        let merged = merge_with_options(&[yaml("xs: [1, 2]"), yaml("xs: [3]")], options).unwrap();
        assert_eq!(merged, yaml("xs: [1, 2, 3]"));
    }

    #[test]
    fn sequences_replace_by_default() {
        let merged = merge(&[yaml("xs: [1, 2]"), yaml("xs: [3]")]).unwrap();
        assert_eq!(merged, yaml("xs: [3]"));
    }

    #[test]
    fn nested_maps_merge_recursively() {
        let merged = merge(&[
            yaml("vars: {tags: {team: core, env: dev}, region: us-east-1}"),
            yaml("vars: {tags: {env: prod}}"),
        ])
        .unwrap();
        assert_eq!(
            merged,
            yaml("vars: {tags: {team: core, env: prod}, region: us-east-1}")
        );
    }

    #[test]
    fn null_does_not_override_but_fills_missing_keys() {
        let merged = merge(&[yaml("a: 1"), yaml("a: null\nb: null")]).unwrap();
        assert_eq!(merged, yaml("a: 1\nb: null"));
    }

    #[test]
    fn kind_change_replaces_without_slice_options() {
        let merged = merge(&[yaml("a: {x: 1}"), yaml("a: flat")]).unwrap();
        assert_eq!(merged, yaml("a: flat"));
        let merged = merge(&[yaml("a: [1]"), yaml("a: flat")]).unwrap();
        assert_eq!(merged, yaml("a: flat"));
    }

    #[test]
    fn slice_deep_copy_merges_common_prefix() {
        let options = MergeOptions {
            slice_deep_copy: true,
            ..MergeOptions::default()
        };
        let merged = merge_with_options(
            &[
                yaml("rules: [{port: 80, cidr: a}, {port: 443}]"),
                yaml("rules: [{cidr: b}, {port: 8443}, {port: 22}]"),
            ],
            options,
        )
        .unwrap();
        assert_eq!(merged, yaml("rules: [{port: 80, cidr: b}, {port: 8443}]"));
    }

    #[test]
    fn slice_options_reject_kind_mismatch() {
        let options = MergeOptions {
            append_slice: true,
            ..MergeOptions::default()
        };
        let err = merge_with_options(&[yaml("vars: {xs: [1]}"), yaml("vars: {xs: 2}")], options)
            .unwrap_err();
        assert_eq!(
            err,
            MergeError::KindMismatch {
                path: "vars.xs".to_owned(),
                dst: "sequence",
                src: "number",
            }
        );
    }

    #[test]
    fn inputs_are_not_mutated() {
        let first = yaml("vars: {tags: {a: 1}}");
        let second = yaml("vars: {tags: {b: 2}}");
        let inputs = [first.clone(), second.clone()];
        let merged = merge(&inputs).unwrap();
        assert_eq!(inputs[0], first);
        assert_eq!(inputs[1], second);
        assert_eq!(merged, yaml("vars: {tags: {a: 1, b: 2}}"));
    }

    #[test]
    fn empty_inputs_are_skipped() {
        let merged = merge(&[Mapping::new(), yaml("a: 1"), Mapping::new()]).unwrap();
        assert_eq!(merged, yaml("a: 1"));
        assert!(merge(&[]).unwrap().is_empty());
    }
}

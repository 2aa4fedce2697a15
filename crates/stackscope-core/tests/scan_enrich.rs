//! Scan and enrich over parsed stacks, the way the root crate drives them.

#![allow(clippy::all, clippy::pedantic, clippy::nursery)]

use std::collections::BTreeMap;

use serde_yaml::Value;
use stackscope_core::{
    enrich_all, find_affected, parse_stacks, AffectedReason, ChangedFiles, ComponentLayout,
    ComponentType, ContextNaming, ScanContext, Stacks,
};

fn stacks(entries: &[(&str, &str)]) -> Stacks {
    let raw: BTreeMap<String, Value> = entries
        .iter()
        .map(|(name, yaml)| ((*name).to_owned(), serde_yaml::from_str(yaml).unwrap()))
        .collect();
    parse_stacks(&raw)
}

const BASE: &str = r"
components:
  terraform:
    vpc-defaults:
      metadata: {type: abstract}
      vars: {cidr: 10.0.0.0/8}
      component: vpc
    vpc:
      component: vpc
      vars: {cidr: 10.0.0.0/16, stage: dev}
      settings:
        spacelift: {workspace_enabled: true}
    rds:
      component: rds
      vars: {size: small}
  helmfile:
    nginx:
      component: nginx
      env: {REPLICAS: '2'}
";

fn layout() -> ComponentLayout {
    ComponentLayout::new("", "components/terraform", "components/helmfile")
}

fn run(current: &Stacks, remote: &Stacks, files: &[&str]) -> Vec<(String, String, AffectedReason)> {
    let changed: ChangedFiles = files.iter().copied().collect();
    let layout = layout();
    let ctx = ScanContext {
        changed_files: &changed,
        layout: &layout,
    };
    let candidates = find_affected(current, remote, &ctx);
    let records = enrich_all(&candidates, &ContextNaming::new(layout.clone())).unwrap();
    records
        .into_iter()
        .map(|r| (r.stack, r.component, r.affected))
        .collect()
}

#[test]
fn identical_snapshots_report_nothing() {
    let s = stacks(&[("dev", BASE)]);
    assert!(run(&s, &s, &[]).is_empty());
}

#[test]
fn folder_change_marks_only_its_component() {
    let s = stacks(&[("dev", BASE)]);
    let found = run(&s, &s, &["components/terraform/vpc/main.tf"]);
    assert_eq!(
        found,
        [("dev".to_owned(), "vpc".to_owned(), AffectedReason::Component)]
    );
}

#[test]
fn abstract_components_are_never_reported() {
    let current = stacks(&[("dev", BASE)]);
    let remote = stacks(&[("dev", "components: {}\n")]);
    let found = run(&current, &remote, &["components/terraform/vpc/main.tf"]);
    assert!(found.iter().all(|(_, c, _)| c != "vpc-defaults"));
    assert_eq!(found.len(), 3);
}

#[test]
fn new_stack_reports_every_component() {
    let current = stacks(&[("dev", BASE), ("prod", BASE)]);
    let remote = stacks(&[("dev", BASE)]);
    let found = run(&current, &remote, &[]);
    assert_eq!(
        found,
        [
            ("prod".to_owned(), "rds".to_owned(), AffectedReason::StackVars),
            ("prod".to_owned(), "vpc".to_owned(), AffectedReason::StackVars),
            ("prod".to_owned(), "nginx".to_owned(), AffectedReason::StackEnv),
        ]
    );
}

#[test]
fn repeated_runs_agree() {
    let current = stacks(&[("dev", BASE)]);
    let remote = stacks(&[("dev", BASE.replace("small", "large").as_str())]);
    let first = run(&current, &remote, &["components/helmfile/nginx/helmfile.yaml"]);
    let second = run(&current, &remote, &["components/helmfile/nginx/helmfile.yaml"]);
    assert_eq!(first, second);
    assert_eq!(
        first,
        [
            ("dev".to_owned(), "rds".to_owned(), AffectedReason::StackVars),
            ("dev".to_owned(), "nginx".to_owned(), AffectedReason::Component),
        ]
    );
}

#[test]
fn records_carry_derived_identifiers() {
    let current = stacks(&[("dev", BASE)]);
    let remote = Stacks::new();
    let changed = ChangedFiles::new();
    let layout = layout();
    let ctx = ScanContext {
        changed_files: &changed,
        layout: &layout,
    };
    let candidates = find_affected(&current, &remote, &ctx);
    let records = enrich_all(&candidates, &ContextNaming::new(layout.clone())).unwrap();
    let vpc = records
        .iter()
        .find(|r| r.component == "vpc" && r.component_type == ComponentType::Terraform)
        .unwrap();
    assert_eq!(vpc.spacelift_stack, "dev-vpc");
    assert_eq!(vpc.component_path, "components/terraform/vpc");
    assert_eq!(vpc.stack_slug, "dev-vpc");
    let rds = records.iter().find(|r| r.component == "rds").unwrap();
    assert!(rds.spacelift_stack.is_empty());
}

//! Shared test helpers for stackscope integration tests.
//!
//! All tests use temp directories, with no side effects on the real repo and no
//! network. "Remote" repositories are plain local repos that the local
//! clone's `origin` points at.

#![allow(dead_code)]

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

/// Run git in `dir`, assert success, return trimmed stdout.
pub fn git(dir: &Path, args: &[&str]) -> String {
    let out = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("failed to run git");
    assert!(
        out.status.success(),
        "git {} failed: {}",
        args.join(" "),
        String::from_utf8_lossy(&out.stderr)
    );
    String::from_utf8_lossy(&out.stdout).trim().to_owned()
}

fn configure_identity(dir: &Path) {
    git(dir, &["config", "user.email", "test@test.com"]);
    git(dir, &["config", "user.name", "Test User"]);
}

/// Write `contents` to `dir/rel`, creating parent directories.
pub fn write(dir: &Path, rel: &str, contents: &str) {
    let path = dir.join(rel);
    std::fs::create_dir_all(path.parent().expect("path has a parent")).unwrap();
    std::fs::write(path, contents).unwrap();
}

/// Stage everything and commit. Returns the new HEAD as hex.
pub fn commit_all(dir: &Path, message: &str) -> String {
    git(dir, &["add", "-A"]);
    git(dir, &["commit", "-q", "-m", message]);
    git(dir, &["rev-parse", "HEAD"])
}

pub const DEV_STACK: &str = r"
vars:
  stage: dev
components:
  terraform:
    vpc-defaults:
      metadata: {type: abstract}
      vars: {cidr: 10.0.0.0/8}
    vpc:
      metadata:
        component: vpc
        inherits: [vpc-defaults]
      vars: {cidr: 10.0.0.0/16}
    rds:
      vars: {size: small}
  helmfile:
    nginx:
      env: {REPLICAS: '2'}
";

/// The "remote": one commit on `main` with three components and one stack.
/// Returns the repo and the commit hex.
pub fn setup_origin() -> (TempDir, String) {
    let dir = TempDir::new().expect("failed to create temp dir");
    git(dir.path(), &["init", "-q", "-b", "main"]);
    configure_identity(dir.path());
    write(dir.path(), "components/terraform/vpc/main.tf", "# vpc\n");
    write(dir.path(), "components/terraform/rds/main.tf", "# rds\n");
    write(dir.path(), "components/helmfile/nginx/helmfile.yaml", "releases: []\n");
    write(dir.path(), "stacks/dev.yaml", DEV_STACK);
    let head = commit_all(dir.path(), "initial commit");
    (dir, head)
}

/// Clone `origin` with the git CLI; the clone's `origin` remote points back at it.
pub fn clone_local(origin: &Path) -> TempDir {
    let dir = TempDir::new().expect("failed to create temp dir");
    let src = origin.to_string_lossy().into_owned();
    git(dir.path(), &["clone", "-q", &src, "."]);
    configure_identity(dir.path());
    dir
}

/// Local edits on top of the origin commit: `vpc` source and `rds` vars change.
pub fn change_vpc_and_rds(local: &Path) -> String {
    write(local, "components/terraform/vpc/main.tf", "# vpc v2\n");
    write(local, "stacks/dev.yaml", &DEV_STACK.replace("small", "large"));
    commit_all(local, "change vpc and rds")
}

/// Entries of a directory, for checking that temporary clones are gone.
pub fn entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(Iterator::count).unwrap_or(0)
}

/// Run the stackscope binary in `dir`.
pub fn stackscope_in(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_stackscope"))
        .args(args)
        .current_dir(dir)
        .env_remove("OTEL_EXPORTER_OTLP_ENDPOINT")
        .env_remove("STACKSCOPE_BASE_PATH")
        .output()
        .expect("failed to execute stackscope")
}

/// Run stackscope and assert it succeeds. Returns stdout as string.
pub fn stackscope_ok(dir: &Path, args: &[&str]) -> String {
    let out = stackscope_in(dir, args);
    let stderr = String::from_utf8_lossy(&out.stderr);
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(
        out.status.success(),
        "stackscope {} failed:\nstdout: {stdout}\nstderr: {stderr}",
        args.join(" "),
    );
    stdout.to_string()
}

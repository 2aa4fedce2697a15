use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use clap::{Args, Subcommand};
use stackscope::config::{CONFIG_FILE, StackscopeConfig};
use stackscope::output::{OutputFormat, emit};
use stackscope::snapshot::CloneRequest;
use stackscope::stacks::YamlStackLoader;
use stackscope::{describe_affected_with_clone, describe_affected_with_repo_path, describe_component};

#[derive(Subcommand)]
pub enum DescribeCommands {
    /// List components affected by changes between the working tree and a
    /// target reference
    ///
    /// By default the local repository's remote (`origin`, else the first
    /// one) is cloned into a temporary directory at its default branch. The
    /// clone is deleted before the command exits.
    ///
    /// Each entry names the component, its stack, and why it is affected:
    /// stack.metadata, component (files in its folder changed), stack.vars,
    /// stack.env, or stack.settings. The first matching reason wins.
    Affected(AffectedArgs),

    /// Show the merged configuration of one component in one stack
    Component(ComponentArgs),
}

#[derive(Args)]
pub struct AffectedArgs {
    /// Reference to compare against, e.g. refs/heads/main or refs/tags/v1.2.0
    #[arg(long = "ref", value_name = "REF")]
    reference: Option<String>,

    /// Commit to compare against; checked out after cloning
    #[arg(long)]
    sha: Option<String>,

    /// Compare against an existing checkout instead of cloning
    #[arg(long, value_name = "PATH", conflicts_with_all = ["reference", "sha", "ssh_key", "ssh_key_password"])]
    repo_path: Option<PathBuf>,

    /// Private key for cloning over ssh; https remotes are rewritten to ssh
    #[arg(long, value_name = "PATH")]
    ssh_key: Option<PathBuf>,

    /// Passphrase for an encrypted --ssh-key
    #[arg(long, env = "STACKSCOPE_SSH_KEY_PASSWORD", hide_env_values = true, requires = "ssh_key")]
    ssh_key_password: Option<String>,

    /// Output format: yaml or json
    #[arg(long, default_value = "yaml")]
    format: OutputFormat,

    /// Write output to this file instead of stdout
    #[arg(long, value_name = "PATH")]
    file: Option<PathBuf>,
}

#[derive(Args)]
pub struct ComponentArgs {
    /// Component name
    component: String,

    /// Stack name, e.g. orgs/acme/dev
    #[arg(long, short)]
    stack: String,

    /// Output format: yaml or json
    #[arg(long, default_value = "yaml")]
    format: OutputFormat,

    /// Write output to this file instead of stdout
    #[arg(long, value_name = "PATH")]
    file: Option<PathBuf>,
}

pub fn run(cmd: DescribeCommands, config_path: Option<&Path>, verbose: bool) -> Result<()> {
    let cwd = std::env::current_dir().context("cannot determine the working directory")?;
    let config_path = config_path.map_or_else(|| cwd.join(CONFIG_FILE), Path::to_path_buf);
    let config = StackscopeConfig::load(&config_path)?.with_env_overrides();
    let loader = YamlStackLoader::new(config.merge_options());

    match cmd {
        DescribeCommands::Affected(args) => {
            let deriver = config.naming(config.layout());
            let records = match &args.repo_path {
                Some(repo_path) => {
                    describe_affected_with_repo_path(&config, &cwd, repo_path, &loader, &deriver)?
                }
                None => {
                    let request = CloneRequest {
                        reference: args.reference,
                        sha: args.sha,
                        ssh_key_path: args.ssh_key,
                        ssh_key_password: args.ssh_key_password,
                        verbose,
                        temp_root: None,
                    };
                    describe_affected_with_clone(&config, &cwd, &request, &loader, &deriver)?
                }
            };
            emit(args.format, &records, args.file.as_deref())
        }
        DescribeCommands::Component(args) => {
            let value = describe_component(&config, &cwd, &args.component, &args.stack, &loader)?;
            emit(args.format, &value, args.file.as_deref())
        }
    }
}

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod describe;

/// Find the infrastructure components a git change affects
///
/// stackscope resolves every stack in the working tree, resolves the same
/// stacks at a target git reference, and reports each component whose
/// configuration or source folder differs, with the reason.
///
/// QUICK START:
///
///   # Compare the working tree with the remote's default branch
///   stackscope describe affected
///
///   # Compare with a branch, as JSON
///   stackscope describe affected --ref refs/heads/main --format json
///
///   # Compare with a checkout already on disk (no network)
///   stackscope describe affected --repo-path ../infra-main
///
///   # Show one component's merged configuration
///   stackscope describe component vpc -s orgs/acme/dev
#[derive(Parser)]
#[command(name = "stackscope")]
#[command(version, about)]
#[command(propagate_version = true)]
#[command(
    after_help = "See 'stackscope <command> --help' for more information on a specific command."
)]
struct Cli {
    /// Path to the config file [default: ./stackscope.toml]
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log progress to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Describe stacks, components, and what changed
    #[command(subcommand)]
    Describe(describe::DescribeCommands),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _telemetry = stackscope::telemetry::init(cli.verbose);

    match cli.command {
        Commands::Describe(cmd) => describe::run(cmd, cli.config.as_deref(), cli.verbose),
    }
}

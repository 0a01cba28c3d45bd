mod commit;
mod completions;
mod config;
mod install;
mod style;
mod summary;
mod update;
mod upgrade;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::error::ExitStatus;

#[derive(Parser)]
#[command(name = "commit-assistant")]
#[command(about = "Draft commit messages and history summaries with a generative AI model")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Show detailed progress
    #[arg(long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Draft a commit message for the staged changes (run by the hook)
    Commit(commit::CommitArgs),

    /// Install the prepare-commit-msg hook into a repository
    Install(install::InstallArgs),

    /// Update the hook and project config of installed repositories
    Update(update::UpdateArgs),

    /// Manage the API key and show the effective settings
    Config(config::ConfigArgs),

    /// Manage commit message styles
    Style(style::StyleArgs),

    /// Summarize commit history in a date range
    Summary(summary::SummaryArgs),

    /// Check for a newer release
    #[command(alias = "check-update")]
    Upgrade(upgrade::UpgradeArgs),

    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}

impl Cli {
    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub async fn run(self) -> Result<ExitStatus> {
        let output = OutputConfig {
            json: self.json,
            quiet: self.quiet,
            verbose: self.verbose,
        };

        match self.command {
            Commands::Commit(args) => commit::run(args, output).await,
            Commands::Install(args) => install::run(args, output).await,
            Commands::Update(args) => update::run(args, output).await,
            Commands::Config(args) => config::run(args, output).await,
            Commands::Style(args) => style::run(args, output).await,
            Commands::Summary(args) => summary::run(args, output).await,
            Commands::Upgrade(args) => upgrade::run(args, output).await,
            Commands::Completions(args) => {
                completions::run(args);
                Ok(ExitStatus::Success)
            }
        }
    }
}

/// Output configuration passed to all commands
#[derive(Debug, Clone, Copy)]
pub struct OutputConfig {
    pub json: bool,
    pub quiet: bool,
    pub verbose: bool,
}

impl OutputConfig {
    /// Human-readable status lines are wanted.
    pub fn chatty(self) -> bool {
        !self.quiet && !self.json
    }
}

/// Canonical repository root for a `--repo-path` argument.
fn repo_root(path: &Path) -> Result<PathBuf> {
    path.canonicalize()
        .with_context(|| format!("Invalid path: {}", path.display()))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

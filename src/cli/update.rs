use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::warn;

use super::install::print_hook_report;
use super::{print_json, repo_root, OutputConfig};
use crate::config::{self, ConfigUpdate};
use crate::error::{AssistantError, ExitStatus};
use crate::hooks::{HookManager, HookReport, HOOK_TEMPLATE};
use crate::registry::InstallationRegistry;

#[derive(Args)]
pub struct UpdateArgs {
    /// Repository to update (defaults to current directory)
    #[arg(long, default_value = ".", conflicts_with = "all_repo")]
    repo_path: PathBuf,

    /// Update every repository the hook was installed into
    #[arg(long)]
    all_repo: bool,
}

#[derive(Serialize)]
struct RepoUpdate {
    repo: String,
    hook: HookReport,
    config: ConfigUpdate,
}

#[derive(Serialize)]
struct RepoFailure {
    repo: String,
    error: String,
}

#[derive(Serialize)]
struct BatchOutput {
    updated: Vec<RepoUpdate>,
    failed: Vec<RepoFailure>,
}

pub async fn run(args: UpdateArgs, output: OutputConfig) -> Result<ExitStatus> {
    let registry = InstallationRegistry::open()?;
    if args.all_repo {
        return update_all(&registry, output);
    }

    let root = repo_root(&args.repo_path)?;
    let result = update_repo(&root, &registry)?;

    if output.json {
        print_json(&result)?;
    } else if !output.quiet {
        print_repo_update(&result);
    }
    Ok(ExitStatus::Success)
}

/// Migrate the project config, refresh the hook and re-record the repository.
fn update_repo(root: &Path, registry: &InstallationRegistry) -> Result<RepoUpdate> {
    if !root.join(".git").exists() {
        return Err(AssistantError::NotGitRepository(root.to_path_buf()).into());
    }
    let config = config::update_project_config(root)?;
    let hook = HookManager::new(root).update(HOOK_TEMPLATE)?;
    registry.record(root)?;
    Ok(RepoUpdate {
        repo: root.display().to_string(),
        hook,
        config,
    })
}

fn update_all(registry: &InstallationRegistry, output: OutputConfig) -> Result<ExitStatus> {
    let installations = registry.list_all();

    if installations.is_empty() && output.chatty() {
        println!(
            "No installed repositories recorded in {}",
            registry.path().display().to_string().dimmed()
        );
    } else if output.chatty() {
        println!(
            "Updating {} installed {}",
            installations.len().to_string().cyan(),
            if installations.len() == 1 {
                "repository"
            } else {
                "repositories"
            }
        );
    }

    let mut batch = BatchOutput {
        updated: Vec::new(),
        failed: Vec::new(),
    };
    for installation in installations {
        let root = PathBuf::from(&installation.repo_path);
        match update_repo(&root, registry) {
            Ok(result) => {
                if output.chatty() {
                    println!();
                    println!("{}", installation.repo_path.bold());
                    print_repo_update(&result);
                }
                batch.updated.push(result);
            }
            Err(e) => {
                warn!(repo = %installation.repo_path, error = %format!("{e:#}"), "update failed");
                if output.chatty() {
                    println!();
                    println!("{}", installation.repo_path.bold());
                    println!("{} {e:#}", "✗".red());
                }
                batch.failed.push(RepoFailure {
                    repo: installation.repo_path,
                    error: format!("{e:#}"),
                });
            }
        }
    }

    if output.json {
        print_json(&batch)?;
    } else if !output.quiet && !(batch.updated.is_empty() && batch.failed.is_empty()) {
        println!();
        let summary = format!(
            "{} updated, {} failed",
            batch.updated.len(),
            batch.failed.len()
        );
        if batch.failed.is_empty() {
            println!("{} {summary}", "✓".green());
        } else {
            println!("{} {summary}", "!".yellow());
        }
    }

    Ok(if batch.failed.is_empty() {
        ExitStatus::Success
    } else {
        ExitStatus::Error
    })
}

fn print_repo_update(result: &RepoUpdate) {
    print_hook_report(&result.hook);
    if result.config.relocated {
        println!(
            "  Config moved to {}",
            result.config.path.display().to_string().dimmed()
        );
    } else if result.config.changed {
        println!(
            "  Config merged: {}",
            result.config.path.display().to_string().dimmed()
        );
    }
}

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use std::path::{Path, PathBuf};

use super::{print_json, repo_root, OutputConfig};
use crate::config::{self, Config};
use crate::error::{AssistantError, ExitStatus};
use crate::hooks::{HookChange, HookManager, HookReport, HOOK_TEMPLATE};
use crate::registry::InstallationRegistry;

#[derive(Args)]
pub struct InstallArgs {
    /// Repository to install into (defaults to current directory)
    #[arg(long, default_value = ".")]
    repo_path: PathBuf,
}

#[derive(Serialize)]
struct InstallOutput {
    status: String,
    repo: String,
    hook: HookReport,
    config_created: bool,
    config: String,
}

pub async fn run(args: InstallArgs, output: OutputConfig) -> Result<ExitStatus> {
    let root = repo_root(&args.repo_path)?;
    if !root.join(".git").exists() {
        return Err(AssistantError::NotGitRepository(root).into());
    }

    let hook = HookManager::new(&root).install(HOOK_TEMPLATE)?;
    let config_created = config::install_project_config(&root)?;
    InstallationRegistry::open()?.record(&root)?;

    if output.json {
        print_json(&InstallOutput {
            status: "installed".to_string(),
            repo: root.display().to_string(),
            config: Config::project_config_path(&root).display().to_string(),
            hook,
            config_created,
        })?;
    } else if !output.quiet {
        print_hook_report(&hook);
        if config_created {
            println!(
                "  Config:   {}",
                Config::project_config_path(&root).display().to_string().dimmed()
            );
        }
        print_next_steps(&root);
    }

    Ok(ExitStatus::Success)
}

/// One status line per hook change, shared with `update`.
pub(super) fn print_hook_report(report: &HookReport) {
    let headline = match report.change {
        HookChange::Created => format!("{} Hook installed ({})", "✓".green(), report.kind),
        HookChange::Merged => format!(
            "{} Hook merged into existing {} hook",
            "✓".green(),
            report.kind
        ),
        HookChange::Migrated => format!(
            "{} Legacy {} hook migrated",
            "✓".green(),
            report.kind
        ),
        HookChange::Updated => format!("{} Hook updated ({})", "✓".green(), report.kind),
        HookChange::Unchanged => format!("{} Hook already up to date", "✓".green()),
    };
    println!("{headline}");
    println!("  Location: {}", report.path.display().to_string().dimmed());
    if let Some(backup) = &report.backup {
        println!("  Backup:   {}", backup.display().to_string().dimmed());
    }
}

fn print_next_steps(root: &Path) {
    if Config::load(root).is_ok_and(|c| c.api_key.is_some()) {
        return;
    }
    println!("\nNext steps:");
    println!(
        "  {} to store your Gemini API key",
        "commit-assistant config setup".cyan()
    );
}

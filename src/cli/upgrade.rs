use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::{print_json, OutputConfig};
use crate::error::ExitStatus;
use crate::ui;
use crate::upgrade::UpgradeChecker;

#[derive(Args)]
pub struct UpgradeArgs {}

pub async fn run(_args: UpgradeArgs, output: OutputConfig) -> Result<ExitStatus> {
    let current = env!("CARGO_PKG_VERSION");
    let checker = UpgradeChecker::for_current_release()?;

    let pb = ui::spinner(output, "Checking for updates");
    let newer = checker.newer_version().await;
    ui::finish(pb);

    if output.json {
        print_json(&serde_json::json!({
            "current": current,
            "latest": newer,
            "update_available": newer.is_some(),
        }))?;
        return Ok(ExitStatus::Success);
    }

    match newer {
        Some(tag) => {
            println!(
                "{} New version {} available (current {})",
                "!".yellow(),
                tag.cyan(),
                current
            );
            if !output.quiet {
                println!("\nUpgrade with:");
                println!(
                    "  {}",
                    format!(
                        "cargo install --git {} --tag {tag} --locked",
                        env!("CARGO_PKG_REPOSITORY")
                    )
                    .cyan()
                );
                println!(
                    "Then refresh installed hooks with {}",
                    "commit-assistant update --all-repo".cyan()
                );
            }
        }
        None => {
            if !output.quiet {
                println!("{} Up to date ({})", "✓".green(), current.cyan());
            }
        }
    }
    Ok(ExitStatus::Success)
}

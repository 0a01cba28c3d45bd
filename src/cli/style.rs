use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;
use dialoguer::Confirm;
use serde::Serialize;
use std::path::{Path, PathBuf};

use super::{print_json, repo_root, OutputConfig};
use crate::config::{self, keys, Config};
use crate::error::ExitStatus;
use crate::styles::{StyleEntry, StyleManager, StyleScope};
use crate::ui;

#[derive(Args)]
pub struct StyleArgs {
    #[command(subcommand)]
    command: StyleCommands,

    /// Repository whose project styles are used (defaults to current directory)
    #[arg(long, default_value = ".", global = true)]
    repo_path: PathBuf,
}

#[derive(Subcommand)]
enum StyleCommands {
    /// List available styles
    List,

    /// Import a style from a TOML file
    Add(AddArgs),

    /// Remove an imported style
    Remove(RemoveArgs),

    /// Make a style the repository's commit style
    Use(UseArgs),
}

#[derive(Args)]
struct AddArgs {
    /// Style file with a `prompt` and optional `description`
    file: PathBuf,

    /// Style name (defaults to the file name)
    #[arg(long)]
    name: Option<String>,

    /// Import into the user-wide style directory instead of the repository
    #[arg(long)]
    global: bool,

    /// Overwrite an existing style without asking
    #[arg(long)]
    force: bool,
}

#[derive(Args)]
struct RemoveArgs {
    name: String,

    /// Remove from the user-wide style directory
    #[arg(long)]
    global: bool,
}

#[derive(Args)]
struct UseArgs {
    name: String,
}

#[derive(Serialize)]
struct ListOutput {
    active: String,
    styles: Vec<StyleEntry>,
}

fn scope_for(global: bool) -> StyleScope {
    if global {
        StyleScope::Global
    } else {
        StyleScope::Project
    }
}

pub async fn run(args: StyleArgs, output: OutputConfig) -> Result<ExitStatus> {
    let root = repo_root(&args.repo_path)?;
    let manager = StyleManager::new(&root)?;

    match args.command {
        StyleCommands::List => run_list(&root, &manager, output),
        StyleCommands::Add(a) => run_add(a, &manager, output),
        StyleCommands::Remove(a) => run_remove(a, &manager, output),
        StyleCommands::Use(a) => run_use(a, &root, &manager, output),
    }
}

fn run_list(root: &Path, manager: &StyleManager, output: OutputConfig) -> Result<ExitStatus> {
    let active = Config::load(root)?.commit_style;
    let styles = manager.list()?;
    // Only the entry `resolve` picks is flagged as active.
    let effective_scope = manager.resolve(&active).ok().map(|s| s.scope);

    if output.json {
        print_json(&ListOutput { active, styles })?;
        return Ok(ExitStatus::Success);
    }

    for entry in &styles {
        let is_active = entry.name == active && Some(entry.scope) == effective_scope;
        let marker = if is_active { "*".green() } else { " ".normal() };
        let name = if is_active {
            entry.name.green().bold()
        } else {
            entry.name.normal()
        };
        let description = entry
            .description
            .as_deref()
            .map(|d| format!("  {}", d.dimmed()))
            .unwrap_or_default();
        println!(
            "{marker} {name:<20} {}{description}",
            format!("[{}]", entry.scope).cyan()
        );
    }
    if effective_scope.is_none() && !output.quiet {
        println!(
            "\n{} active style '{}' was not found; the default style will be used",
            "!".yellow(),
            active
        );
    }
    Ok(ExitStatus::Success)
}

fn run_add(args: AddArgs, manager: &StyleManager, output: OutputConfig) -> Result<ExitStatus> {
    let scope = scope_for(args.global);
    let force = args.force;
    let imported = manager.import(&args.file, args.name.as_deref(), scope, |name| {
        if force {
            return Ok(true);
        }
        Confirm::new()
            .with_prompt(format!("Style '{name}' already exists in {scope} scope. Overwrite?"))
            .default(false)
            .interact()
            .map_err(|dialoguer::Error::IO(e)| ui::prompt_error(e, "read confirmation"))
    })?;

    let Some(path) = imported else {
        if output.chatty() {
            println!("{}", "Cancelled".yellow());
        }
        return Ok(ExitStatus::Cancelled);
    };

    if output.json {
        print_json(&serde_json::json!({
            "status": "added",
            "scope": scope,
            "path": path.display().to_string(),
        }))?;
    } else if !output.quiet {
        println!("{} Style added ({scope})", "✓".green());
        println!("  Location: {}", path.display().to_string().dimmed());
    }
    Ok(ExitStatus::Success)
}

fn run_remove(args: RemoveArgs, manager: &StyleManager, output: OutputConfig) -> Result<ExitStatus> {
    let scope = scope_for(args.global);
    let removed = manager.remove(&args.name, scope)?;

    if output.json {
        let status = if removed { "removed" } else { "not_found" };
        print_json(&serde_json::json!({
            "status": status,
            "name": args.name,
            "scope": scope,
        }))?;
    } else if !output.quiet {
        if removed {
            println!("{} Style '{}' removed ({scope})", "✓".green(), args.name);
        } else {
            println!(
                "{}",
                format!("No {scope} style named '{}'", args.name).yellow()
            );
        }
    }
    Ok(if removed {
        ExitStatus::Success
    } else {
        ExitStatus::Error
    })
}

fn run_use(
    args: UseArgs,
    root: &Path,
    manager: &StyleManager,
    output: OutputConfig,
) -> Result<ExitStatus> {
    let style = manager.resolve(&args.name)?;
    config::set_project_value(root, keys::COMMIT_STYLE, &style.name)?;

    if output.json {
        print_json(&serde_json::json!({
            "status": "active",
            "name": style.name,
            "scope": style.scope,
        }))?;
    } else if !output.quiet {
        println!(
            "{} Commit style set to {} ({})",
            "✓".green(),
            style.name.cyan(),
            style.scope
        );
    }
    Ok(ExitStatus::Success)
}

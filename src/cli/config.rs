use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use dialoguer::{Confirm, Password};
use serde::Serialize;
use std::path::PathBuf;

use super::{print_json, repo_root, OutputConfig};
use crate::config::{self, keys, Config};
use crate::error::ExitStatus;
use crate::hooks::{HookManager, HookVersion};
use crate::ui;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommands,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Store the Gemini API key in the user environment file
    Setup(SetupArgs),

    /// Show the effective configuration for a repository
    Show(ShowArgs),

    /// Delete the user environment file
    Clear(ClearArgs),

    /// Print the configured API key, masked
    GetApiKey(ShowArgs),
}

#[derive(Args)]
struct SetupArgs {
    /// API key (prompted for when omitted)
    #[arg(long)]
    key: Option<String>,
}

#[derive(Args)]
struct ShowArgs {
    /// Repository whose project config is layered in (defaults to current directory)
    #[arg(long, default_value = ".")]
    repo_path: PathBuf,
}

#[derive(Args)]
struct ClearArgs {
    /// Skip the confirmation prompt
    #[arg(long, short = 'y')]
    yes: bool,
}

#[derive(Serialize)]
struct ShowOutput {
    #[serde(flatten)]
    config: Config,
    api_key: Option<String>,
    env_file: String,
    project_config: Option<String>,
    hook: HookVersion,
}

pub async fn run(args: ConfigArgs, output: OutputConfig) -> Result<ExitStatus> {
    match args.command {
        ConfigCommands::Setup(a) => run_setup(a, output),
        ConfigCommands::Show(a) => run_show(a, output),
        ConfigCommands::Clear(a) => run_clear(a, output),
        ConfigCommands::GetApiKey(a) => run_get_api_key(a, output),
    }
}

fn run_setup(args: SetupArgs, output: OutputConfig) -> Result<ExitStatus> {
    let key = match args.key {
        Some(key) => key,
        None => Password::new()
            .with_prompt("Gemini API key")
            .interact()
            .map_err(|dialoguer::Error::IO(e)| ui::prompt_error(e, "read the API key"))?,
    };
    let key = key.trim();
    if key.is_empty() {
        anyhow::bail!("API key must not be empty");
    }

    let env_file = Config::env_file()?;
    config::write_env_value(&env_file, keys::GEMINI_API_KEY, key)?;

    if output.json {
        print_json(&serde_json::json!({
            "status": "saved",
            "env_file": env_file.display().to_string(),
        }))?;
    } else if !output.quiet {
        println!("{} API key saved", "✓".green());
        println!("  Location: {}", env_file.display().to_string().dimmed());
        println!("\nCheck it with {}", "commit-assistant config show".cyan());
    }
    Ok(ExitStatus::Success)
}

fn run_show(args: ShowArgs, output: OutputConfig) -> Result<ExitStatus> {
    let root = repo_root(&args.repo_path)?;
    let config = Config::load(&root)?;
    let project_config = Config::project_config_path(&root);
    let project_config = project_config
        .exists()
        .then(|| project_config.display().to_string());
    let hook = HookManager::new(&root).version()?;

    if output.json {
        print_json(&ShowOutput {
            api_key: config.api_key.as_deref().map(config::mask_secret),
            env_file: Config::env_file()?.display().to_string(),
            config,
            project_config,
            hook,
        })?;
        return Ok(ExitStatus::Success);
    }

    for (key, value) in config.entries() {
        println!("{key}: {}", value.cyan());
    }
    match config.api_key.as_deref() {
        Some(secret) => println!("{}: {}", keys::GEMINI_API_KEY, config::mask_secret(secret)),
        None => println!("{}: {}", keys::GEMINI_API_KEY, "not configured".yellow()),
    }
    if !output.quiet {
        println!();
        println!(
            "  Env file:       {}",
            Config::env_file()?.display().to_string().dimmed()
        );
        match project_config {
            Some(path) => println!("  Project config: {}", path.dimmed()),
            None => println!("  Project config: {}", "none".dimmed()),
        }
        let hook_str = match hook {
            HookVersion::New => hook.to_string().green(),
            _ => hook.to_string().yellow(),
        };
        println!("  Hook:           {hook_str}");
    }
    Ok(ExitStatus::Success)
}

fn run_clear(args: ClearArgs, output: OutputConfig) -> Result<ExitStatus> {
    let env_file = Config::env_file()?;
    if !env_file.exists() {
        if output.json {
            print_json(&serde_json::json!({ "status": "not_found" }))?;
        } else if !output.quiet {
            println!("{}", "No configuration file found".yellow());
        }
        return Ok(ExitStatus::Success);
    }

    let confirmed = args.yes
        || Confirm::new()
            .with_prompt(format!("Delete {}?", env_file.display()))
            .default(false)
            .interact()
            .map_err(|dialoguer::Error::IO(e)| ui::prompt_error(e, "read confirmation"))?;
    if !confirmed {
        if !output.quiet && !output.json {
            println!("{}", "Cancelled".yellow());
        }
        return Ok(ExitStatus::Cancelled);
    }

    std::fs::remove_file(&env_file)
        .with_context(|| format!("Failed to remove {}", env_file.display()))?;

    if output.json {
        print_json(&serde_json::json!({ "status": "cleared" }))?;
    } else if !output.quiet {
        println!("{} Configuration cleared", "✓".green());
    }
    Ok(ExitStatus::Success)
}

fn run_get_api_key(args: ShowArgs, output: OutputConfig) -> Result<ExitStatus> {
    let root = repo_root(&args.repo_path)?;
    let masked = Config::load(&root)?
        .api_key
        .as_deref()
        .map(config::mask_secret);

    if output.json {
        print_json(&serde_json::json!({ "api_key": masked }))?;
    } else {
        match masked {
            Some(masked) => println!("API key: {masked}"),
            None => println!("{}", "API key not configured".yellow()),
        }
    }
    Ok(ExitStatus::Success)
}

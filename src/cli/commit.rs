use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use dialoguer::{Confirm, Editor, Select};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::{repo_root, OutputConfig};
use crate::ai::{GeminiClient, TextGenerator};
use crate::config::{Config, DEFAULT_STYLE};
use crate::error::{AssistantError, ExitStatus};
use crate::git::GitRepo;
use crate::styles::{ResolvedStyle, StyleManager};
use crate::ui;

#[derive(Args)]
pub struct CommitArgs {
    /// Commit message file passed to the hook by git
    #[arg(long)]
    msg_file: PathBuf,

    /// Repository to read staged changes from (defaults to current directory)
    #[arg(long, default_value = ".")]
    repo_path: PathBuf,

    /// Use the suggestion without asking
    #[arg(long, short = 'y')]
    yes: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Use,
    Edit,
    Cancel,
}

const ACTIONS: [(Action, &str); 3] = [
    (Action::Use, "Use this message"),
    (Action::Edit, "Edit the message"),
    (Action::Cancel, "Cancel the commit"),
];

pub async fn run(args: CommitArgs, output: OutputConfig) -> Result<ExitStatus> {
    let root = repo_root(&args.repo_path)?;
    let config = Config::load(&root)?;
    if !config.enabled {
        debug!("commit assistant disabled for this repository");
        return Ok(ExitStatus::Success);
    }

    let repo = GitRepo::open(&root)?;
    let pb = ui::spinner(output, "Analyzing staged changes");
    let staged = repo.staged_files();
    ui::finish(pb);
    let files = staged?;
    if files.is_empty() {
        return Err(AssistantError::NoStagedChanges.into());
    }
    let diff = repo.staged_diff()?;

    let client = GeminiClient::from_config(&config)?;
    let style = resolve_style(&root, &config.commit_style)?;
    let prompt = style.def.render(&files, &diff);

    if output.chatty() {
        println!(
            "Drafting commit message with {} in {} style",
            client.model().cyan(),
            style.name.cyan()
        );
    }
    let pb = ui::spinner(output, "Generating commit message");
    let drafted = draft(&client, &prompt).await;
    ui::finish(pb);
    let suggestion = drafted?;

    let message = if args.yes {
        suggestion
    } else {
        show_message("Suggested commit message", &suggestion);
        match choose_action()? {
            Action::Use => suggestion,
            Action::Edit => edit_until_confirmed(suggestion)?,
            Action::Cancel => return Err(AssistantError::Cancelled.into()),
        }
    };

    write_message(&args.msg_file, &message)?;
    if !output.quiet {
        println!("{} Commit message updated", "✓".green());
    }
    Ok(ExitStatus::Success)
}

/// The configured style, or the default one when it no longer exists.
fn resolve_style(root: &Path, name: &str) -> Result<ResolvedStyle> {
    let manager = StyleManager::new(root)?;
    match manager.resolve(name) {
        Err(e) if matches!(e.downcast_ref::<AssistantError>(), Some(AssistantError::StyleNotFound(_))) => {
            warn!(style = name, "style not found; using {DEFAULT_STYLE}");
            manager.resolve(DEFAULT_STYLE)
        }
        other => other,
    }
}

async fn draft<G: TextGenerator>(generator: &G, prompt: &str) -> Result<String> {
    let text = generator
        .generate(prompt)
        .await
        .ok_or(AssistantError::GenerationFailed)?;
    let message = ui::clean_message(&text);
    if message.is_empty() {
        return Err(AssistantError::GenerationFailed.into());
    }
    Ok(message)
}

fn show_message(title: &str, message: &str) {
    let rule = "=".repeat(50);
    println!("\n{}", title.bold());
    println!("{}", rule.dimmed());
    println!("{}", message.blue());
    println!("{}", rule.dimmed());
}

fn choose_action() -> Result<Action> {
    let labels: Vec<&str> = ACTIONS.iter().map(|(_, label)| *label).collect();
    let selection = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact_opt()
        .map_err(|dialoguer::Error::IO(e)| ui::prompt_error(e, "read selection"))?;
    Ok(selection.map_or(Action::Cancel, |idx| ACTIONS[idx].0))
}

/// Open the editor until the user accepts the text. Closing the editor
/// without saving cancels.
fn edit_until_confirmed(mut message: String) -> Result<String> {
    loop {
        let Some(edited) = Editor::new()
            .edit(&message)
            .map_err(|dialoguer::Error::IO(e)| ui::prompt_error(e, "open the editor"))?
        else {
            return Err(AssistantError::Cancelled.into());
        };
        message = ui::clean_message(&edited);

        show_message("Your commit message", &message);
        let confirmed = Confirm::new()
            .with_prompt("Use this message?")
            .default(true)
            .interact()
            .map_err(|dialoguer::Error::IO(e)| ui::prompt_error(e, "read confirmation"))?;
        if confirmed {
            return Ok(message);
        }
    }
}

fn write_message(path: &Path, message: &str) -> Result<()> {
    std::fs::write(path, format!("{}\n", ui::clean_message(message)))
        .with_context(|| format!("Failed to write {}", path.display()))
}

use anyhow::{Context, Result};
use chrono::{Duration, Local, NaiveDate, NaiveDateTime, NaiveTime};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

use super::{print_json, repo_root, OutputConfig};
use crate::ai::{GeminiClient, TextGenerator};
use crate::config::Config;
use crate::error::{AssistantError, ExitStatus};
use crate::git::{GitRepo, SystemRunner};
use crate::ui;

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const SUMMARY_PROMPT: &str = "\
Summarize the following git history as a short plain-text report.
Group related commits, use one line per item, and do not include commit
hashes, emoji or markup.

Commit log:
";

#[derive(Args)]
pub struct SummaryArgs {
    /// Start of the range, `YYYY-MM-DD` or `YYYY-MM-DD HH:MM:SS` (defaults to today 00:00:00)
    #[arg(long)]
    start_from: Option<String>,

    /// End of the range, `YYYY-MM-DD` or `YYYY-MM-DD HH:MM:SS` (defaults to today 23:59:59)
    #[arg(long)]
    end_to: Option<String>,

    /// Only include commits by this author
    #[arg(long)]
    author: Option<String>,

    /// Repository to summarize (defaults to current directory)
    #[arg(long, default_value = ".")]
    repo_path: PathBuf,

    /// Do not copy the summary to the clipboard
    #[arg(long)]
    no_copy: bool,
}

#[derive(Serialize)]
struct SummaryOutput {
    start: String,
    end: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    author: Option<String>,
    summary: Option<String>,
}

/// Which end of the range a bare date stands for.
#[derive(Clone, Copy)]
enum Bound {
    Start,
    End,
}

fn parse_bound(text: Option<&str>, bound: Bound, today: NaiveDate) -> Result<NaiveDateTime> {
    let day_edge = |date: NaiveDate| {
        let midnight = date.and_time(NaiveTime::default());
        match bound {
            Bound::Start => midnight,
            Bound::End => midnight + Duration::seconds(86_399),
        }
    };

    let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) else {
        return Ok(day_edge(today));
    };
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, DATETIME_FORMAT) {
        return Ok(dt);
    }
    NaiveDate::parse_from_str(text, DATE_FORMAT)
        .map(day_edge)
        .with_context(|| format!("Invalid date '{text}': expected YYYY-MM-DD or YYYY-MM-DD HH:MM:SS"))
}

pub async fn run(args: SummaryArgs, output: OutputConfig) -> Result<ExitStatus> {
    let root = repo_root(&args.repo_path)?;
    let today = Local::now().date_naive();
    let start = parse_bound(args.start_from.as_deref(), Bound::Start, today)?;
    let end = parse_bound(args.end_to.as_deref(), Bound::End, today)?;
    if start > end {
        anyhow::bail!("--start-from must not be after --end-to");
    }

    let config = Config::load(&root)?;
    let repo = GitRepo::open(&root)?;
    let log = repo.commits_in_range(start, end, args.author.as_deref())?;

    let mut result = SummaryOutput {
        start: start.format(DATETIME_FORMAT).to_string(),
        end: end.format(DATETIME_FORMAT).to_string(),
        author: args.author.clone(),
        summary: None,
    };

    if log.trim().is_empty() {
        if output.json {
            print_json(&result)?;
        } else if !output.quiet {
            println!(
                "{}",
                format!("No commits between {} and {}", result.start, result.end).yellow()
            );
        }
        return Ok(ExitStatus::Success);
    }

    let client = GeminiClient::from_config(&config)?;
    let pb = ui::spinner(output, "Summarizing commits");
    let generated = client.generate(&format!("{SUMMARY_PROMPT}{log}")).await;
    ui::finish(pb);
    let summary = generated
        .map(|text| ui::clean_message(&text))
        .filter(|text| !text.is_empty())
        .ok_or(AssistantError::GenerationFailed)?;

    if output.json {
        result.summary = Some(summary.clone());
        print_json(&result)?;
    } else {
        println!("\n{}", "Commit summary".bold());
        println!("{}", "=".repeat(50).dimmed());
        println!("{summary}");
        println!("{}", "=".repeat(50).dimmed());
    }

    if !args.no_copy {
        if ui::copy_to_clipboard(&SystemRunner, repo.root(), &summary) {
            if output.chatty() {
                println!("{} Summary copied to clipboard", "✓".green());
            }
        } else if !output.quiet {
            eprintln!("{} Could not copy the summary to the clipboard", "!".yellow());
        }
    }

    Ok(ExitStatus::Success)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, 14).unwrap()
    }

    fn dt(text: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(text, DATETIME_FORMAT).unwrap()
    }

    #[test]
    fn test_defaults_cover_today() {
        assert_eq!(
            parse_bound(None, Bound::Start, today()).unwrap(),
            dt("2024-02-14 00:00:00")
        );
        assert_eq!(
            parse_bound(Some(" "), Bound::End, today()).unwrap(),
            dt("2024-02-14 23:59:59")
        );
    }

    #[test]
    fn test_bare_dates_expand_to_day_edges() {
        assert_eq!(
            parse_bound(Some("2024-01-01"), Bound::Start, today()).unwrap(),
            dt("2024-01-01 00:00:00")
        );
        assert_eq!(
            parse_bound(Some("2024-01-31"), Bound::End, today()).unwrap(),
            dt("2024-01-31 23:59:59")
        );
    }

    #[test]
    fn test_full_timestamps_are_kept() {
        assert_eq!(
            parse_bound(Some("2024-01-01 12:30:00"), Bound::End, today()).unwrap(),
            dt("2024-01-01 12:30:00")
        );
    }

    #[test]
    fn test_invalid_date() {
        let err = parse_bound(Some("yesterday"), Bound::Start, today()).unwrap_err();
        assert!(err.to_string().contains("Invalid date"));
    }
}

use clap::Parser;
use colored::Colorize;
use std::process::ExitCode;

mod ai;
mod cli;
mod config;
mod error;
mod git;
mod hooks;
mod registry;
mod styles;
mod ui;
mod upgrade;

use cli::Cli;
use error::ExitStatus;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose() {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(default_level.into())
                .from_env_lossy(),
        )
        .init();

    tokio::spawn(async {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\n{}", "Operation cancelled".yellow());
            std::process::exit(i32::from(ExitStatus::Cancelled.code()));
        }
    });

    let status = match cli.run().await {
        Ok(status) => status,
        Err(e) => {
            let status = ExitStatus::from_error(&e);
            if status == ExitStatus::Cancelled {
                eprintln!("{}", format!("{e:#}").yellow());
            } else {
                eprintln!("{} {e:#}", "Error:".red().bold());
            }
            status
        }
    };
    status.into()
}

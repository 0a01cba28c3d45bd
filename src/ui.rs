//! Terminal helpers shared by the commands.

use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::cli::OutputConfig;
use crate::error::AssistantError;
use crate::git::ProcessRunner;

/// Spinner for a slow call. Hidden when output is quiet or JSON.
pub fn spinner(output: OutputConfig, message: &str) -> Option<ProgressBar> {
    if output.quiet || output.json {
        return None;
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    Some(pb)
}

pub fn finish(pb: Option<ProgressBar>) {
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
}

/// Error for a prompt that could not be answered. Ctrl+C while a prompt is
/// open surfaces as `Interrupted` and counts as a cancellation.
pub fn prompt_error(err: impl Into<io::Error>, action: &str) -> anyhow::Error {
    let err = err.into();
    if err.kind() == io::ErrorKind::Interrupted {
        debug!(action, "prompt interrupted");
        return AssistantError::Cancelled.into();
    }
    anyhow::Error::new(err).context(format!("Failed to {action}"))
}

/// Remove surrounding whitespace and a wrapping code fence from model output.
pub fn clean_message(raw: &str) -> String {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```") {
        // Drop the fence line, which may name a language.
        text = rest.split_once('\n').map_or("", |(_, body)| body);
        text = text.trim_end();
        text = text.strip_suffix("```").unwrap_or(text);
    }
    text.trim().trim_matches('`').trim().to_string()
}

/// Clipboard utilities tried in order.
const CLIPBOARD_COMMANDS: [&[&str]; 4] = [
    &["pbcopy"],
    &["wl-copy"],
    &["xclip", "-selection", "clipboard"],
    &["clip.exe"],
];

/// Copy `text` with the first clipboard utility that works.
pub fn copy_to_clipboard<R: ProcessRunner>(runner: &R, cwd: &Path, text: &str) -> bool {
    for argv in CLIPBOARD_COMMANDS {
        match runner.run_with_input(argv, cwd, text) {
            Ok(_) => return true,
            Err(e) => debug!(command = argv[0], error = %e, "clipboard utility unavailable"),
        }
    }
    false
}

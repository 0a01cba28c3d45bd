use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::debug;

use crate::error::AssistantError;

/// Runs external programs. Swapped for a fake in tests.
pub trait ProcessRunner {
    /// Run `argv` in `cwd` with extra environment variables and return stdout.
    ///
    /// A non-zero exit is an [`AssistantError::CommandFailed`].
    fn run(&self, argv: &[&str], cwd: &Path, env: &[(&str, &str)]) -> Result<String>;

    /// Like [`ProcessRunner::run`], feeding `input` to the child's stdin.
    fn run_with_input(&self, argv: &[&str], cwd: &Path, input: &str) -> Result<String>;
}

/// [`ProcessRunner`] backed by `std::process::Command`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl SystemRunner {
    fn check(argv: &[&str], output: &std::process::Output) -> Result<String> {
        if !output.status.success() {
            return Err(AssistantError::CommandFailed {
                program: argv.join(" "),
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
            .into());
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl ProcessRunner for SystemRunner {
    fn run(&self, argv: &[&str], cwd: &Path, env: &[(&str, &str)]) -> Result<String> {
        let (program, args) = argv.split_first().context("Empty command line")?;
        debug!(command = %argv.join(" "), cwd = %cwd.display(), "running");

        let output = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .envs(env.iter().copied())
            .output()
            .with_context(|| format!("Failed to run {program}"))?;
        Self::check(argv, &output)
    }

    fn run_with_input(&self, argv: &[&str], cwd: &Path, input: &str) -> Result<String> {
        use std::io::Write;

        let (program, args) = argv.split_first().context("Empty command line")?;
        debug!(command = %argv.join(" "), "running with stdin");

        let mut child = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to run {program}"))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(input.as_bytes())
                .with_context(|| format!("Failed to write to {program}"))?;
        }
        let output = child
            .wait_with_output()
            .with_context(|| format!("Failed to wait for {program}"))?;
        Self::check(argv, &output)
    }
}

/// Timestamp format git accepts for `--since`/`--until`.
const GIT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Read-only access to one repository through the `git` CLI.
pub struct GitRepo<R: ProcessRunner> {
    root: PathBuf,
    runner: R,
}

impl GitRepo<SystemRunner> {
    pub fn open(root: &Path) -> Result<Self> {
        Self::with_runner(root, SystemRunner)
    }
}

impl<R: ProcessRunner> GitRepo<R> {
    /// Open `root`, which must contain a `.git` entry.
    pub fn with_runner(root: &Path, runner: R) -> Result<Self> {
        let root = root
            .canonicalize()
            .with_context(|| format!("Invalid path: {}", root.display()))?;
        if !root.join(".git").exists() {
            return Err(AssistantError::NotGitRepository(root).into());
        }
        debug!(repo = %root.display(), "opened repository");
        Ok(Self { root, runner })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn git(&self, args: &[&str]) -> Result<String> {
        let mut argv = Vec::with_capacity(args.len() + 1);
        argv.push("git");
        argv.extend_from_slice(args);
        // Keep porcelain output in English and uncolored.
        self.runner
            .run(&argv, &self.root, &[("LC_ALL", "C"), ("GIT_PAGER", "cat")])
    }

    /// Paths of staged files.
    pub fn staged_files(&self) -> Result<Vec<String>> {
        let output = self.git(&["diff", "--cached", "--name-only"])?;
        Ok(output
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect())
    }

    /// Full staged diff.
    pub fn staged_diff(&self) -> Result<String> {
        self.git(&["diff", "--cached"])
    }

    /// True once `HEAD` points at a commit.
    pub fn has_commits(&self) -> bool {
        self.git(&["rev-parse", "--verify", "--quiet", "HEAD"]).is_ok()
    }

    /// `git log` text for commits between `start` and `end`, optionally
    /// restricted to one author. Empty for a repository without commits.
    pub fn commits_in_range(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        author: Option<&str>,
    ) -> Result<String> {
        if !self.has_commits() {
            debug!(repo = %self.root.display(), "no commits yet");
            return Ok(String::new());
        }
        let since = format!("--since={}", start.format(GIT_DATE_FORMAT));
        let until = format!("--until={}", end.format(GIT_DATE_FORMAT));
        let mut args = vec!["log", since.as_str(), until.as_str()];
        if let Some(author) = author.map(str::trim).filter(|a| !a.is_empty()) {
            args.push("--author");
            args.push(author);
        }
        self.git(&args)
    }
}

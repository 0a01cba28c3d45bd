//! Installation and upgrade of the `prepare-commit-msg` hook.
//!
//! [`HookManager`] resolves where the hook lives (plain git or husky), reads
//! its current text, asks [`region`] for the merged text and writes it back
//! with a timestamped backup of the previous version.

pub mod region;

use anyhow::{Context, Result};
use chrono::Local;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub use region::HookVersion;

/// File name of the hook in both `.git/hooks` and `.husky`.
pub const HOOK_NAME: &str = "prepare-commit-msg";

/// Shell payload placed inside the managed region.
///
/// Exit status 1 from `commit-assistant commit` means the user cancelled and
/// aborts the commit; any other failure falls back to git's normal editor.
pub const HOOK_TEMPLATE: &str = r#"# Drafts the commit message with commit-assistant.
# Skipped for merges, amends, squashes and messages given with -m/-F.
COMMIT_MSG_FILE="$1"
COMMIT_SOURCE="$2"

if [ -n "$COMMIT_SOURCE" ]; then
  exit 0
fi

if ! command -v commit-assistant >/dev/null 2>&1; then
  exit 0
fi

# No controlling terminal (IDE clients, CI): leave the message to git.
if (exec < /dev/tty) 2>/dev/null; then
  exec < /dev/tty
else
  exit 0
fi

commit-assistant commit --msg-file "$COMMIT_MSG_FILE"
status=$?

if [ "$status" -eq 1 ]; then
  echo "commit-assistant: commit cancelled" >&2
  exit 1
fi

exit 0"#;

/// Which hook convention a repository uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HookKind {
    Git,
    Husky,
}

impl HookKind {
    /// Text that precedes the region when the hook file is created from scratch.
    ///
    /// Husky runs hook files through its own shell wrapper, so they carry no
    /// shebang of their own.
    pub fn bootstrap(self) -> &'static str {
        match self {
            HookKind::Git => "#!/bin/sh\n\n",
            HookKind::Husky => "",
        }
    }
}

impl std::fmt::Display for HookKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HookKind::Git => write!(f, "git"),
            HookKind::Husky => write!(f, "husky"),
        }
    }
}

/// Resolved hook location for a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookTarget {
    pub kind: HookKind,
    pub path: PathBuf,
}

impl HookTarget {
    /// Husky when the repo has a `.husky` directory or lists `husky` in the
    /// `devDependencies` of its `package.json`; plain git otherwise.
    pub fn resolve(repo_root: &Path) -> Self {
        if uses_husky(repo_root) {
            Self {
                kind: HookKind::Husky,
                path: repo_root.join(".husky").join(HOOK_NAME),
            }
        } else {
            Self {
                kind: HookKind::Git,
                path: repo_root.join(".git").join("hooks").join(HOOK_NAME),
            }
        }
    }
}

fn uses_husky(repo_root: &Path) -> bool {
    if repo_root.join(".husky").is_dir() {
        return true;
    }

    let package_json = repo_root.join("package.json");
    let Ok(content) = std::fs::read_to_string(&package_json) else {
        return false;
    };
    match serde_json::from_str::<serde_json::Value>(&content) {
        Ok(manifest) => manifest
            .get("devDependencies")
            .and_then(|deps| deps.get("husky"))
            .is_some(),
        Err(e) => {
            debug!(path = %package_json.display(), error = %e, "ignoring malformed package.json");
            false
        }
    }
}

/// What an install or update did to the hook file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HookChange {
    /// Hook file did not exist and was created.
    Created,
    /// Region was added to an existing user hook.
    Merged,
    /// Legacy section was converted and refreshed.
    Migrated,
    /// Existing region payload was replaced.
    Updated,
    /// Nothing to write.
    Unchanged,
}

#[derive(Debug, Clone, Serialize)]
pub struct HookReport {
    pub kind: HookKind,
    pub path: PathBuf,
    pub previous: HookVersion,
    pub change: HookChange,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup: Option<PathBuf>,
}

/// Owns the hook file of one repository.
pub struct HookManager {
    target: HookTarget,
}

impl HookManager {
    pub fn new(repo_root: &Path) -> Self {
        Self {
            target: HookTarget::resolve(repo_root),
        }
    }

    /// Current format of the hook file.
    pub fn version(&self) -> Result<HookVersion> {
        Ok(self
            .read_current()?
            .as_deref()
            .map_or(HookVersion::NotInstalled, HookVersion::detect))
    }

    /// First-time install. A hook that already carries a region is left
    /// alone; a legacy hook is migrated so the file never holds two payloads.
    pub fn install(&self, payload: &str) -> Result<HookReport> {
        let current = self.read_current()?;
        let previous = current
            .as_deref()
            .map_or(HookVersion::NotInstalled, HookVersion::detect);

        let (updated, change) = match (previous, current.as_deref()) {
            (HookVersion::NotInstalled, existing) => (
                region::inject_region(existing, payload, self.target.kind.bootstrap()),
                if existing.is_some() {
                    HookChange::Merged
                } else {
                    HookChange::Created
                },
            ),
            (HookVersion::Old, Some(text)) => (
                region::replace_region(&region::migrate_legacy(text), payload),
                HookChange::Migrated,
            ),
            (_, existing) => (existing.unwrap_or_default().to_string(), HookChange::Unchanged),
        };

        self.apply(current.as_deref(), updated, previous, change)
    }

    /// Bring the region up to date with `payload`, migrating legacy hooks
    /// first. A missing hook file is installed fresh.
    pub fn update(&self, payload: &str) -> Result<HookReport> {
        let current = self.read_current()?;
        let previous = current
            .as_deref()
            .map_or(HookVersion::NotInstalled, HookVersion::detect);

        let (updated, change) = match (previous, current.as_deref()) {
            (_, None) => (
                region::inject_region(None, payload, self.target.kind.bootstrap()),
                HookChange::Created,
            ),
            (HookVersion::NotInstalled, Some(text)) => {
                (region::replace_region(text, payload), HookChange::Merged)
            }
            (HookVersion::Old, Some(text)) => {
                info!(path = %self.target.path.display(), "migrating legacy hook section");
                (
                    region::replace_region(&region::migrate_legacy(text), payload),
                    HookChange::Migrated,
                )
            }
            (HookVersion::New, Some(text)) => {
                (region::replace_region(text, payload), HookChange::Updated)
            }
        };

        self.apply(current.as_deref(), updated, previous, change)
    }

    fn read_current(&self) -> Result<Option<String>> {
        let path = &self.target.path;
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(Some(content))
    }

    /// Write `updated` unless it matches the original text byte for byte.
    fn apply(
        &self,
        original: Option<&str>,
        updated: String,
        previous: HookVersion,
        change: HookChange,
    ) -> Result<HookReport> {
        let path = &self.target.path;

        if original == Some(updated.as_str()) {
            debug!(path = %path.display(), "hook already up to date");
            return Ok(HookReport {
                kind: self.target.kind,
                path: path.clone(),
                previous,
                change: HookChange::Unchanged,
                backup: None,
            });
        }

        let backup = if original.is_some() {
            Some(backup_hook(path)?)
        } else {
            None
        };

        write_hook(path, &updated)?;
        info!(path = %path.display(), ?change, "hook written");

        Ok(HookReport {
            kind: self.target.kind,
            path: path.clone(),
            previous,
            change,
            backup,
        })
    }
}

/// `<hook>.backup_<YYYYMMDD_HHMMSS>` next to the hook.
fn backup_path(hook_path: &Path) -> PathBuf {
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    let file_name = hook_path
        .file_name()
        .map_or_else(|| HOOK_NAME.to_string(), |n| n.to_string_lossy().into_owned());
    hook_path.with_file_name(format!("{file_name}.backup_{stamp}"))
}

fn backup_hook(hook_path: &Path) -> Result<PathBuf> {
    backup_to(hook_path, &backup_path(hook_path))
}

/// Copy the hook to `base`, or to `base_1`, `base_2`, ... when that name is
/// taken. Existing backups are never overwritten.
fn backup_to(hook_path: &Path, base: &Path) -> Result<PathBuf> {
    let content = std::fs::read(hook_path)
        .with_context(|| format!("Failed to read {}", hook_path.display()))?;

    let mut candidate = base.to_path_buf();
    let mut attempt = 0u32;
    loop {
        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(mut file) => {
                file.write_all(&content)
                    .with_context(|| format!("Failed to write backup {}", candidate.display()))?;
                debug!(backup = %candidate.display(), "hook backed up");
                return Ok(candidate);
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                attempt += 1;
                let mut name = base.as_os_str().to_owned();
                name.push(format!("_{attempt}"));
                candidate = PathBuf::from(name);
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!(
                        "Failed to back up {} to {}",
                        hook_path.display(),
                        candidate.display()
                    )
                });
            }
        }
    }
}

/// A symlinked hook is written through to its target so the link survives.
fn write_destination(path: &Path) -> PathBuf {
    match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_symlink() => {
            std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
        }
        _ => path.to_path_buf(),
    }
}

/// Write through a sibling temp file and rename over the hook, leaving it
/// executable.
fn write_hook(path: &Path, content: &str) -> Result<()> {
    let path = write_destination(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let file_name = path
        .file_name()
        .map_or_else(|| HOOK_NAME.to_string(), |n| n.to_string_lossy().into_owned());
    let staging = path.with_file_name(format!(".{file_name}.commit-assistant.tmp"));

    let result = std::fs::write(&staging, content)
        .with_context(|| format!("Failed to write {}", staging.display()))
        .and_then(|()| set_executable(&staging))
        .and_then(|()| {
            std::fs::rename(&staging, &path)
                .with_context(|| format!("Failed to replace {}", path.display()))
        });
    if result.is_err() {
        let _ = std::fs::remove_file(&staging);
    }
    result
}

#[cfg(unix)]
fn set_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let perms = std::fs::Permissions::from_mode(0o755);
    std::fs::set_permissions(path, perms)
        .with_context(|| format!("Failed to set permissions on {}", path.display()))
}

#[cfg(not(unix))]
fn set_executable(_path: &Path) -> Result<()> {
    Ok(())
}

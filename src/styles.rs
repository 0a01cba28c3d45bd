//! Prompt styles used to draft commit messages.
//!
//! A style is a small TOML document whose `prompt` carries the
//! `{changed_files}` and `{diff_content}` placeholders. Styles are looked up
//! by name in the project, then the user's global directory, then the
//! built-in set.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::Config;
use crate::error::AssistantError;

const CHANGED_FILES_VAR: &str = "{changed_files}";
const DIFF_CONTENT_VAR: &str = "{diff_content}";
const STYLE_EXT: &str = "toml";

const CONVENTIONAL_PROMPT: &str = r#"You are an experienced software engineer writing a git commit message.
Use the Conventional Commits format:

<type>(<optional scope>): <summary>

<body explaining what changed and why>

Allowed types: feat, fix, docs, style, refactor, perf, test, build, ci, chore, revert.
Keep the summary under 72 characters, imperative mood, no trailing period.
Wrap the body at 72 columns. Reply with the commit message only, without code fences.

Changed files:
{changed_files}

Staged diff:
{diff_content}
"#;

const ANGULAR_PROMPT: &str = r#"You are an experienced software engineer writing a git commit message.
Follow the Angular commit message convention:

<type>(<scope>): <short summary>

<body>

<footer>

Types: build, ci, docs, feat, fix, perf, refactor, test.
The summary is lowercase, imperative and has no trailing period.
Mention breaking changes in the footer as "BREAKING CHANGE: <description>".
Reply with the commit message only, without code fences.

Changed files:
{changed_files}

Staged diff:
{diff_content}
"#;

const EMOJI_PROMPT: &str = r#"You are an experienced software engineer writing a git commit message.
Start the summary line with one gitmoji that matches the change
(for example ✨ new feature, 🐛 bug fix, 📝 docs, ♻️ refactor, ✅ tests, 🔧 config),
followed by a short imperative summary under 72 characters.
Add a blank line and a short body explaining what changed and why.
Reply with the commit message only, without code fences.

Changed files:
{changed_files}

Staged diff:
{diff_content}
"#;

/// Built-in styles, always available.
pub const SYSTEM_STYLES: [(&str, &str, &str); 3] = [
    ("conventional", "Conventional Commits", CONVENTIONAL_PROMPT),
    ("angular", "Angular commit convention", ANGULAR_PROMPT),
    ("emoji", "Gitmoji-prefixed summary", EMOJI_PROMPT),
];

/// Where a style is defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StyleScope {
    Project,
    Global,
    System,
}

impl std::fmt::Display for StyleScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StyleScope::Project => write!(f, "project"),
            StyleScope::Global => write!(f, "global"),
            StyleScope::System => write!(f, "system"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleDef {
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl StyleDef {
    /// Parse and validate a style document.
    pub fn parse(name: &str, content: &str) -> Result<Self> {
        let def: StyleDef = toml::from_str(content).map_err(|e| AssistantError::InvalidStyle {
            name: name.to_string(),
            reason: e.message().to_string(),
        })?;
        def.validate(name)?;
        Ok(def)
    }

    fn validate(&self, name: &str) -> Result<()> {
        for var in [CHANGED_FILES_VAR, DIFF_CONTENT_VAR] {
            if !self.prompt.contains(var) {
                return Err(AssistantError::InvalidStyle {
                    name: name.to_string(),
                    reason: format!("prompt is missing the {var} placeholder"),
                }
                .into());
            }
        }
        Ok(())
    }

    /// Fill in the placeholders.
    pub fn render(&self, changed_files: &[String], diff: &str) -> String {
        self.prompt
            .replace(CHANGED_FILES_VAR, &changed_files.join("\n"))
            .replace(DIFF_CONTENT_VAR, diff)
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedStyle {
    pub name: String,
    pub scope: StyleScope,
    pub def: StyleDef,
}

#[derive(Debug, Clone, Serialize)]
pub struct StyleEntry {
    pub name: String,
    pub scope: StyleScope,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Style names become file names, so keep them to a safe alphabet.
pub fn validate_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(AssistantError::InvalidStyle {
            name: name.to_string(),
            reason: "names may only contain letters, digits, '-' and '_'".into(),
        }
        .into())
    }
}

pub struct StyleManager {
    project_dir: PathBuf,
    global_dir: PathBuf,
}

impl StyleManager {
    pub fn new(repo_root: &Path) -> Result<Self> {
        Ok(Self::with_dirs(
            Config::project_dir(repo_root).join("style"),
            Config::data_dir()?.join("styles"),
        ))
    }

    pub fn with_dirs(project_dir: PathBuf, global_dir: PathBuf) -> Self {
        Self {
            project_dir,
            global_dir,
        }
    }

    /// Directory backing a writable scope.
    pub fn dir(&self, scope: StyleScope) -> Option<&Path> {
        match scope {
            StyleScope::Project => Some(&self.project_dir),
            StyleScope::Global => Some(&self.global_dir),
            StyleScope::System => None,
        }
    }

    fn style_path(&self, scope: StyleScope, name: &str) -> Option<PathBuf> {
        self.dir(scope)
            .map(|dir| dir.join(format!("{name}.{STYLE_EXT}")))
    }

    /// Find a style by name: project first, then global, then built-in.
    pub fn resolve(&self, name: &str) -> Result<ResolvedStyle> {
        validate_name(name)?;

        for scope in [StyleScope::Project, StyleScope::Global] {
            let Some(path) = self.style_path(scope, name) else {
                continue;
            };
            if path.is_file() {
                let content = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                debug!(style = name, %scope, "resolved style");
                return Ok(ResolvedStyle {
                    name: name.to_string(),
                    scope,
                    def: StyleDef::parse(name, &content)?,
                });
            }
        }

        SYSTEM_STYLES
            .iter()
            .find(|(n, _, _)| *n == name)
            .map(|(n, description, prompt)| ResolvedStyle {
                name: (*n).to_string(),
                scope: StyleScope::System,
                def: StyleDef {
                    prompt: (*prompt).to_string(),
                    description: Some((*description).to_string()),
                },
            })
            .ok_or_else(|| AssistantError::StyleNotFound(name.to_string()).into())
    }

    /// Every style in every scope, system first. Unparseable files are
    /// listed without a description.
    pub fn list(&self) -> Result<Vec<StyleEntry>> {
        let mut entries: Vec<StyleEntry> = SYSTEM_STYLES
            .iter()
            .map(|(name, description, _)| StyleEntry {
                name: (*name).to_string(),
                scope: StyleScope::System,
                description: Some((*description).to_string()),
            })
            .collect();

        for scope in [StyleScope::Global, StyleScope::Project] {
            let Some(dir) = self.dir(scope) else { continue };
            for path in style_files(dir)? {
                let Some(name) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
                    continue;
                };
                let description = std::fs::read_to_string(&path)
                    .ok()
                    .and_then(|c| toml::from_str::<StyleDef>(&c).ok())
                    .and_then(|d| d.description);
                entries.push(StyleEntry {
                    name,
                    scope,
                    description,
                });
            }
        }
        Ok(entries)
    }

    /// Copy a validated style file into `scope`.
    ///
    /// `confirm_overwrite` is asked before replacing an existing style; a
    /// `false` answer returns `Ok(None)`.
    pub fn import(
        &self,
        source: &Path,
        name: Option<&str>,
        scope: StyleScope,
        confirm_overwrite: impl FnOnce(&str) -> Result<bool>,
    ) -> Result<Option<PathBuf>> {
        let name = match name {
            Some(n) => n.to_string(),
            None => source
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .context("Style file has no name")?,
        };
        validate_name(&name)?;

        let content = std::fs::read_to_string(source)
            .with_context(|| format!("Failed to read {}", source.display()))?;
        StyleDef::parse(&name, &content)?;

        let target = self
            .style_path(scope, &name)
            .context("Built-in styles cannot be modified")?;
        if target.exists() && !confirm_overwrite(&name)? {
            return Ok(None);
        }
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        std::fs::write(&target, content)
            .with_context(|| format!("Failed to write {}", target.display()))?;
        Ok(Some(target))
    }

    /// Delete a style from `scope`. Returns false when it was not there.
    pub fn remove(&self, name: &str, scope: StyleScope) -> Result<bool> {
        validate_name(name)?;
        let path = self
            .style_path(scope, name)
            .context("Built-in styles cannot be removed")?;
        if !path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(&path)
            .with_context(|| format!("Failed to remove {}", path.display()))?;
        Ok(true)
    }
}

fn style_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let pattern = format!(
        "{}/*.{STYLE_EXT}",
        glob::Pattern::escape(&dir.to_string_lossy())
    );
    let mut files: Vec<PathBuf> = glob::glob(&pattern)
        .with_context(|| format!("Invalid style directory: {}", dir.display()))?
        .filter_map(std::result::Result::ok)
        .collect();
    files.sort();
    Ok(files)
}

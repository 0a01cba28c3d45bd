use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::AssistantError;

/// Per-repository directory holding the project config and project styles.
pub const PROJECT_DIR_NAME: &str = ".commit-assistant";
/// Project config file name (also its legacy name at the repository root).
pub const CONFIG_FILE_NAME: &str = ".commit-assistant-config";
/// Overrides the user data directory.
pub const HOME_ENV: &str = "COMMIT_ASSISTANT_HOME";

/// Recognized configuration keys.
pub mod keys {
    pub const ENABLE_COMMIT_ASSISTANT: &str = "ENABLE_COMMIT_ASSISTANT";
    pub const USE_MODEL: &str = "USE_MODEL";
    /// Older spelling of [`USE_MODEL`].
    pub const GENERATIVE_MODEL: &str = "GENERATIVE_MODEL";
    pub const GEMINI_API_KEY: &str = "GEMINI_API_KEY";
    pub const COMMIT_STYLE: &str = "COMMIT_STYLE";
    pub const GEMINI_API_BASE: &str = "GEMINI_API_BASE";

    pub const ALL: [&str; 6] = [
        ENABLE_COMMIT_ASSISTANT,
        USE_MODEL,
        GENERATIVE_MODEL,
        GEMINI_API_KEY,
        COMMIT_STYLE,
        GEMINI_API_BASE,
    ];
}

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_STYLE: &str = "conventional";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Written to `<repo>/.commit-assistant/.commit-assistant-config` on install.
pub const CONFIG_TEMPLATE: &str = "\
# commit-assistant project configuration
# Set ENABLE_COMMIT_ASSISTANT=false to skip AI drafting in this repository.
ENABLE_COMMIT_ASSISTANT=true
COMMIT_STYLE=conventional
";

/// One source of key/value settings.
pub type Layer = BTreeMap<String, String>;

/// Effective settings for one invocation.
///
/// Built once by [`Config::load`] from, lowest priority first: defaults, the
/// user `.env` file, process environment, the project config file.
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    pub enabled: bool,
    pub model: String,
    #[serde(skip)]
    pub api_key: Option<String>,
    pub commit_style: String,
    pub api_base: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enabled: true,
            model: DEFAULT_MODEL.into(),
            api_key: None,
            commit_style: DEFAULT_STYLE.into(),
            api_base: DEFAULT_API_BASE.into(),
        }
    }
}

impl Config {
    /// Load the layered configuration for `repo_root`.
    ///
    /// A missing or unreadable layer is skipped; only the data directory
    /// lookup can fail.
    pub fn load(repo_root: &Path) -> Result<Self> {
        let env_file = Self::env_file()?;
        let layers = [
            read_env_file(&env_file),
            process_env_layer(),
            read_project_layer(&Self::project_config_path(repo_root)),
        ];
        Ok(Self::from_layers(&layers))
    }

    /// Fold layers over the defaults; later layers win.
    pub fn from_layers(layers: &[Layer]) -> Self {
        let mut config = Self::default();
        for layer in layers {
            config.apply(layer);
        }
        config
    }

    fn apply(&mut self, layer: &Layer) {
        if let Some(v) = layer.get(keys::ENABLE_COMMIT_ASSISTANT) {
            self.enabled = v.trim().eq_ignore_ascii_case("true");
        }
        if let Some(v) = layer
            .get(keys::USE_MODEL)
            .or_else(|| layer.get(keys::GENERATIVE_MODEL))
        {
            if !v.is_empty() {
                self.model = v.clone();
            }
        }
        if let Some(v) = layer.get(keys::GEMINI_API_KEY) {
            self.api_key = if v.is_empty() { None } else { Some(v.clone()) };
        }
        if let Some(v) = layer.get(keys::COMMIT_STYLE) {
            if !v.is_empty() {
                self.commit_style = v.clone();
            }
        }
        if let Some(v) = layer.get(keys::GEMINI_API_BASE) {
            if !v.is_empty() {
                self.api_base = v.trim_end_matches('/').to_string();
            }
        }
    }

    /// Settings as displayed by `config show`, API key excluded.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        vec![
            (keys::ENABLE_COMMIT_ASSISTANT, self.enabled.to_string()),
            (keys::USE_MODEL, self.model.clone()),
            (keys::COMMIT_STYLE, self.commit_style.clone()),
            (keys::GEMINI_API_BASE, self.api_base.clone()),
        ]
    }

    /// User data directory: `$COMMIT_ASSISTANT_HOME` or the platform data dir.
    pub fn data_dir() -> Result<PathBuf> {
        if let Ok(home) = std::env::var(HOME_ENV) {
            if !home.is_empty() {
                return Ok(PathBuf::from(home));
            }
        }
        let project_dirs = directories::ProjectDirs::from("dev", "commit-assistant", "commit-assistant")
            .context("Failed to determine user directories")?;
        Ok(project_dirs.data_dir().to_path_buf())
    }

    /// User-wide `.env` file holding the API key.
    pub fn env_file() -> Result<PathBuf> {
        Ok(Self::data_dir()?.join(".env"))
    }

    pub fn project_dir(repo_root: &Path) -> PathBuf {
        repo_root.join(PROJECT_DIR_NAME)
    }

    pub fn project_config_path(repo_root: &Path) -> PathBuf {
        Self::project_dir(repo_root).join(CONFIG_FILE_NAME)
    }

    /// Where releases before the project directory kept the config.
    pub fn legacy_config_path(repo_root: &Path) -> PathBuf {
        repo_root.join(CONFIG_FILE_NAME)
    }
}

/// Parse `KEY=VALUE` lines, skipping blanks and `#` comments.
pub fn parse_key_values(content: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match line.split_once('=') {
            Some((key, value)) => pairs.push((key.trim().to_string(), value.trim().to_string())),
            None => warn!(line = idx + 1, "skipping config line without '='"),
        }
    }
    pairs
}

fn read_project_layer(path: &Path) -> Layer {
    match std::fs::read_to_string(path) {
        Ok(content) => parse_key_values(&content).into_iter().collect(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Layer::new(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read project config");
            Layer::new()
        }
    }
}

/// Read a dotenv file without touching the process environment.
pub fn read_env_file(path: &Path) -> Layer {
    let iter = match dotenvy::from_path_iter(path) {
        Ok(iter) => iter,
        Err(e) => {
            if path.exists() {
                warn!(path = %path.display(), error = %e, "failed to open env file");
            }
            return Layer::new();
        }
    };

    let mut layer = Layer::new();
    for item in iter {
        match item {
            Ok((key, value)) => {
                layer.insert(key, value);
            }
            Err(e) => warn!(path = %path.display(), error = %e, "skipping malformed env entry"),
        }
    }
    layer
}

fn process_env_layer() -> Layer {
    keys::ALL
        .iter()
        .filter_map(|key| std::env::var(key).ok().map(|v| ((*key).to_string(), v)))
        .collect()
}

/// Set `key` in a key/value document, keeping comments and other lines.
/// The key is appended when absent.
pub fn set_value(content: &str, key: &str, value: &str) -> String {
    let mut found = false;
    let mut lines: Vec<String> = content
        .lines()
        .map(|line| {
            let trimmed = line.trim();
            if trimmed.starts_with('#') || trimmed.is_empty() {
                return line.to_string();
            }
            match trimmed.split_once('=') {
                Some((k, _)) if k.trim() == key => {
                    found = true;
                    format!("{key}={value}")
                }
                _ => line.to_string(),
            }
        })
        .collect();
    if !found {
        lines.push(format!("{key}={value}"));
    }
    let mut result = lines.join("\n");
    result.push('\n');
    result
}

/// Lay the user's values over the template layout.
///
/// Comments and key order follow the template. Template keys take the
/// user's value when present; keys unknown to the template are kept at the
/// end.
pub fn merge_with_template(current: &str, template: &str) -> String {
    let user: Vec<(String, String)> = parse_key_values(current);
    let user_map: BTreeMap<&str, &str> = user.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();

    let mut template_keys = Vec::new();
    let mut lines = Vec::new();
    for line in template.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            lines.push(line.to_string());
            continue;
        }
        match trimmed.split_once('=') {
            Some((key, default)) => {
                let key = key.trim();
                let value = user_map.get(key).copied().unwrap_or_else(|| default.trim());
                template_keys.push(key.to_string());
                lines.push(format!("{key}={value}"));
            }
            None => lines.push(line.to_string()),
        }
    }

    for (key, value) in &user {
        if !template_keys.iter().any(|k| k == key) {
            lines.push(format!("{key}={value}"));
        }
    }

    let mut result = lines.join("\n");
    result.push('\n');
    result
}

/// Write the config template into the project unless a config exists.
/// Returns true when the file was created.
pub fn install_project_config(repo_root: &Path) -> Result<bool> {
    let path = Config::project_config_path(repo_root);
    if path.exists() {
        debug!(path = %path.display(), "project config already present");
        return Ok(false);
    }
    write_file(&path, CONFIG_TEMPLATE)?;
    Ok(true)
}

/// Outcome of [`update_project_config`].
#[derive(Debug, Clone, Serialize)]
pub struct ConfigUpdate {
    pub path: PathBuf,
    /// The config was moved from the repository root.
    pub relocated: bool,
    pub changed: bool,
}

/// Move a root-level legacy config into the project directory, then merge
/// it with the current template.
pub fn update_project_config(repo_root: &Path) -> Result<ConfigUpdate> {
    let path = Config::project_config_path(repo_root);
    let legacy = Config::legacy_config_path(repo_root);

    let mut relocated = false;
    if legacy.is_file() {
        if path.exists() {
            warn!(
                legacy = %legacy.display(),
                "both legacy and project config exist; keeping the project config"
            );
        } else {
            std::fs::create_dir_all(Config::project_dir(repo_root))
                .context("Failed to create project config directory")?;
            std::fs::rename(&legacy, &path).with_context(|| {
                format!("Failed to move {} to {}", legacy.display(), path.display())
            })?;
            relocated = true;
        }
    }

    let current = if path.exists() {
        std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?
    } else {
        String::new()
    };

    let merged = merge_with_template(&current, CONFIG_TEMPLATE);
    let changed = merged != current;
    if changed {
        write_file(&path, &merged)?;
    }

    Ok(ConfigUpdate {
        path,
        relocated,
        changed,
    })
}

/// Rewrite one key in the project config. The file must already exist.
pub fn set_project_value(repo_root: &Path, key: &str, value: &str) -> Result<()> {
    let path = Config::project_config_path(repo_root);
    if !path.exists() {
        return Err(AssistantError::ConfigMissing(path).into());
    }
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    write_file(&path, &set_value(&content, key, value))
}

/// Set `key` in the user `.env` file, creating it when needed.
pub fn write_env_value(path: &Path, key: &str, value: &str) -> Result<()> {
    let current = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e).with_context(|| format!("Failed to read {}", path.display())),
    };
    write_file(path, &set_value(&current, key, value))
}

/// Show the first and last five characters of a secret.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 10 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..5].iter().collect();
    let tail: String = chars[chars.len() - 5..].iter().collect();
    format!("{head}{}{tail}", "*".repeat(chars.len() - 10))
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}

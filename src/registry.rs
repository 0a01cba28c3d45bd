//! Record of every repository the hook was installed into, so `update
//! --all-repo` can revisit them.

use anyhow::{Context, Result};
use chrono::Local;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::config::Config;

pub const REGISTRY_FILE_NAME: &str = "installations.toml";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Installation {
    pub id: String,
    pub repo_path: String,
    pub version: String,
    pub installed_at: String,
    pub last_updated_at: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    installations: BTreeMap<String, Installation>,
}

pub struct InstallationRegistry {
    path: PathBuf,
}

impl InstallationRegistry {
    /// Registry in the user data directory.
    pub fn open() -> Result<Self> {
        Ok(Self::at(Config::data_dir()?.join(REGISTRY_FILE_NAME)))
    }

    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> RegistryFile {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return RegistryFile::default(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to read installation registry");
                return RegistryFile::default();
            }
        };
        toml::from_str(&content).unwrap_or_else(|e| {
            warn!(path = %self.path.display(), error = %e, "installation registry is corrupt; starting fresh");
            RegistryFile::default()
        })
    }

    fn save(&self, file: &RegistryFile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(file).context("Failed to serialize installation registry")?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write {}", self.path.display()))
    }

    /// Add or refresh `repo_path`. A known repository keeps its
    /// `installed_at`.
    pub fn record(&self, repo_path: &Path) -> Result<Installation> {
        let repo_path = normalize_path(repo_path)?;
        let id = installation_id(&repo_path);
        let now = Local::now().format(TIMESTAMP_FORMAT).to_string();

        let mut file = self.load();
        let installed_at = file
            .installations
            .get(&id)
            .map(|existing| existing.installed_at.clone())
            .unwrap_or_else(|| now.clone());

        let entry = Installation {
            id: id.clone(),
            repo_path,
            version: env!("CARGO_PKG_VERSION").to_string(),
            installed_at,
            last_updated_at: now,
        };
        file.installations.insert(id, entry.clone());
        self.save(&file)?;
        debug!(repo = %entry.repo_path, "recorded installation");
        Ok(entry)
    }

    /// Entries whose repository still exists, sorted by path.
    pub fn list_all(&self) -> Vec<Installation> {
        let mut entries: Vec<Installation> = self
            .load()
            .installations
            .into_values()
            .filter(|entry| {
                let exists = Path::new(&entry.repo_path).is_dir();
                if !exists {
                    warn!(repo = %entry.repo_path, "skipping installation whose path no longer exists");
                }
                exists
            })
            .collect();
        entries.sort_by(|a, b| a.repo_path.cmp(&b.repo_path));
        entries
    }
}

/// Canonical absolute path with forward slashes.
fn normalize_path(path: &Path) -> Result<String> {
    let canonical = path
        .canonicalize()
        .with_context(|| format!("Invalid path: {}", path.display()))?;
    Ok(canonical.to_string_lossy().replace('\\', "/"))
}

fn installation_id(normalized: &str) -> String {
    hex::encode(Sha256::digest(normalized.as_bytes()))
}

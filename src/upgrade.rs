//! Release check against the project's published tags.

use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;
use std::cmp::Ordering;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, warn};

/// Overrides where release tags are fetched from.
pub const RELEASES_URL_ENV: &str = "COMMIT_ASSISTANT_RELEASES_URL";
const CHECK_TIMEOUT: Duration = Duration::from_secs(10);

/// `major.minor.patch`, with an optional `v` prefix and pre-release suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub pre: Option<String>,
}

impl Version {
    pub fn parse(text: &str) -> Option<Self> {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        let pattern = PATTERN.get_or_init(|| {
            Regex::new(r"^v?(\d+)\.(\d+)(?:\.(\d+))?(?:-([0-9A-Za-z.-]+))?$")
                .expect("version pattern is valid")
        });
        let caps = pattern.captures(text.trim())?;
        let number = |idx: usize| -> Option<u64> {
            caps.get(idx).map_or(Some(0), |m| m.as_str().parse().ok())
        };
        Some(Self {
            major: number(1)?,
            minor: number(2)?,
            patch: number(3)?,
            pre: caps.get(4).map(|m| m.as_str().to_string()),
        })
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| match (&self.pre, &other.pre) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(b),
            })
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Deserialize)]
struct Tag {
    name: String,
}

/// Highest parseable tag newer than `current`.
pub fn newest_tag<'a>(current: &Version, tags: impl IntoIterator<Item = &'a str>) -> Option<String> {
    tags.into_iter()
        .filter_map(|tag| Version::parse(tag).map(|v| (v, tag)))
        .filter(|(v, _)| v > current)
        .max_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(_, tag)| tag.to_string())
}

/// Tag listing for the repository in `Cargo.toml`.
pub fn default_releases_url() -> String {
    let repo = env!("CARGO_PKG_REPOSITORY")
        .trim_end_matches('/')
        .trim_start_matches("https://github.com/");
    format!("https://api.github.com/repos/{repo}/tags")
}

pub struct UpgradeChecker {
    tags_url: String,
    current: Version,
    http: reqwest::Client,
}

impl UpgradeChecker {
    pub fn new(tags_url: String, current: &str) -> Result<Self> {
        let current = Version::parse(current)
            .with_context(|| format!("Invalid current version: {current}"))?;
        let http = reqwest::Client::builder()
            .timeout(CHECK_TIMEOUT)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            tags_url,
            current,
            http,
        })
    }

    /// Checker for the running binary, honoring [`RELEASES_URL_ENV`].
    pub fn for_current_release() -> Result<Self> {
        let url = std::env::var(RELEASES_URL_ENV)
            .ok()
            .filter(|u| !u.is_empty())
            .unwrap_or_else(default_releases_url);
        Self::new(url, env!("CARGO_PKG_VERSION"))
    }

    async fn fetch_tags(&self) -> Result<Vec<String>> {
        debug!(url = %self.tags_url, "fetching release tags");
        let tags: Vec<Tag> = self
            .http
            .get(&self.tags_url)
            .send()
            .await
            .context("Failed to reach the release server")?
            .error_for_status()
            .context("Release server returned an error")?
            .json()
            .await
            .context("Failed to parse release tags")?;
        Ok(tags.into_iter().map(|t| t.name).collect())
    }

    /// Newer release tag, if any. Any network or parse failure counts as
    /// "no update".
    pub async fn newer_version(&self) -> Option<String> {
        match self.fetch_tags().await {
            Ok(tags) => newest_tag(&self.current, tags.iter().map(String::as_str)),
            Err(e) => {
                warn!(error = %format!("{e:#}"), "update check failed");
                None
            }
        }
    }
}

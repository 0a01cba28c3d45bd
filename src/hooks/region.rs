//! Text surgery for the managed region inside a hook script.
//!
//! A hook file is an opaque shell script owned by the user, except for one
//! span delimited by [`START_MARKER`] and [`END_MARKER`]. Releases before the
//! marker pair wrote a single [`LEGACY_MARKER`] line and treated everything
//! after it as their payload; those files are migrated forward on update.
//!
//! Every function here is pure: it takes the current text and returns the
//! text that should be written. Reading, backups and writes live in
//! [`super::HookManager`].

use serde::Serialize;
use tracing::warn;

pub const START_MARKER: &str = "### BEGIN: commit-assistant hook section (DO NOT REMOVE) ###";
pub const END_MARKER: &str = "### END: commit-assistant hook section (DO NOT REMOVE) ###";
/// Single-line marker written by the first releases. Read-only.
pub const LEGACY_MARKER: &str = "# 以下內容由 commit-assistant 提供";

pub const DEFAULT_SHEBANG: &str = "#!/bin/sh";
const ORIGINAL_CONTENT_HEADER: &str = "# Original hook content";

/// Format of the tool-owned section found in a hook file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HookVersion {
    /// No recognized marker.
    NotInstalled,
    /// Legacy marker without a closing delimiter.
    Old,
    /// Start and end markers of the managed region.
    New,
}

impl HookVersion {
    /// Classify hook text. The new start marker wins over the legacy marker
    /// when both are present.
    pub fn detect(content: &str) -> Self {
        if content.contains(START_MARKER) {
            HookVersion::New
        } else if content.contains(LEGACY_MARKER) {
            HookVersion::Old
        } else {
            HookVersion::NotInstalled
        }
    }
}

impl std::fmt::Display for HookVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HookVersion::NotInstalled => write!(f, "not installed"),
            HookVersion::Old => write!(f, "legacy"),
            HookVersion::New => write!(f, "current"),
        }
    }
}

/// Byte range of a managed region, start marker through end marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionSpan {
    pub start: usize,
    pub end: usize,
    /// False when the start marker has no matching end marker; the span then
    /// runs to the end of the text.
    pub terminated: bool,
}

/// Build the delimited block for `payload`, without a trailing newline.
pub fn region_block(payload: &str) -> String {
    format!("{START_MARKER}\n{payload}\n{END_MARKER}")
}

/// Number of start markers in the text. A well-formed hook has zero or one.
pub fn region_count(content: &str) -> usize {
    content.matches(START_MARKER).count()
}

/// Locate the first managed region.
///
/// The end marker is searched only after the start marker, so an end marker
/// that precedes the start marker is ignored. Later regions, if any, are not
/// reported.
pub fn find_region(content: &str) -> Option<RegionSpan> {
    let start = content.find(START_MARKER)?;
    let body_start = start + START_MARKER.len();
    let span = match content[body_start..].find(END_MARKER) {
        Some(offset) => RegionSpan {
            start,
            end: body_start + offset + END_MARKER.len(),
            terminated: true,
        },
        None => RegionSpan {
            start,
            end: content.len(),
            terminated: false,
        },
    };
    Some(span)
}

/// Payload left behind by a legacy install: everything after the line that
/// holds the legacy marker, trimmed.
///
/// Returns an empty string when the marker is missing, when nothing follows
/// the marker line, or when the marker line has no terminating newline.
pub fn extract_legacy_payload(content: &str) -> String {
    let Some(marker_idx) = content.find(LEGACY_MARKER) else {
        return String::new();
    };
    let from_marker = &content[marker_idx..];
    let Some(newline) = from_marker.find('\n') else {
        return String::new();
    };
    from_marker[newline + 1..].trim().to_string()
}

/// Rewrite a legacy hook into the marker-pair format.
///
/// Text before the legacy marker is kept (right-trimmed) and the legacy
/// payload is wrapped in a managed region. Input that is not in the legacy
/// format is returned unchanged.
pub fn migrate_legacy(content: &str) -> String {
    if HookVersion::detect(content) != HookVersion::Old {
        return content.to_string();
    }
    let Some(marker_idx) = content.find(LEGACY_MARKER) else {
        return content.to_string();
    };

    let prefix = content[..marker_idx].trim_end();
    let payload = extract_legacy_payload(content);
    format!("{prefix}\n\n{START_MARKER}\n{payload}\n{END_MARKER}\n")
}

/// Add a managed region to a hook that has none.
///
/// `existing` is `None` when no hook file exists yet; the result is then
/// `bootstrap` followed by the region. An existing script keeps its own
/// leading shebang (or gets [`DEFAULT_SHEBANG`]), followed by a header
/// comment, the original body with stray `#!/bin/sh` lines dropped, and the
/// region at the end. Text that already carries a region comes back as is.
///
/// Shebang normalization only ever yields one shebang line, but it is not
/// forced to `#!/bin/sh`: a user hook starting with another interpreter
/// (`#!/usr/bin/env bash`, `#!/bin/zsh`) keeps it, since the user's own body
/// may depend on that shell. The payload itself is POSIX `sh`.
pub fn inject_region(existing: Option<&str>, payload: &str, bootstrap: &str) -> String {
    let block = region_block(payload);

    let current = match existing {
        Some(text) if !text.trim().is_empty() => text,
        _ => return format!("{bootstrap}{block}\n"),
    };

    if current.contains(START_MARKER) {
        return current.to_string();
    }

    let (shebang, body) = split_shebang(current);

    let mut merged = String::with_capacity(current.len() + block.len() + 64);
    merged.push_str(shebang);
    merged.push_str("\n\n");
    merged.push_str(ORIGINAL_CONTENT_HEADER);
    merged.push('\n');
    for line in body.split_inclusive('\n') {
        if line.trim_end() == DEFAULT_SHEBANG {
            continue;
        }
        merged.push_str(line);
    }
    if merged.ends_with('\n') {
        merged.push('\n');
    } else {
        merged.push_str("\n\n");
    }
    merged.push_str(&block);
    merged.push('\n');
    merged
}

/// Replace the managed region with one carrying `payload`.
///
/// With no region present the block is appended after a blank line, the
/// existing text first being normalized to end in exactly one newline. With
/// several regions only the first is replaced. An unterminated region (start
/// marker, no end marker) is replaced through the end of the text.
pub fn replace_region(content: &str, payload: &str) -> String {
    let block = region_block(payload);

    let Some(span) = find_region(content) else {
        let body = content.trim_end_matches('\n');
        if body.is_empty() {
            return format!("{block}\n");
        }
        return format!("{body}\n\n{block}\n");
    };

    let regions = region_count(content);
    if regions > 1 {
        warn!(regions, "hook contains several managed regions; only the first is replaced");
    }

    let mut updated = String::with_capacity(content.len() + block.len());
    updated.push_str(&content[..span.start]);
    updated.push_str(&block);
    if span.terminated {
        updated.push_str(&content[span.end..]);
    } else {
        warn!("managed region has no end marker; replacing through end of file");
        updated.push('\n');
    }
    updated
}

/// Split off the first line when it is a shebang.
fn split_shebang(content: &str) -> (&str, &str) {
    if content.starts_with("#!") {
        match content.find('\n') {
            Some(idx) => (content[..idx].trim_end(), &content[idx + 1..]),
            None => (content.trim_end(), ""),
        }
    } else {
        (DEFAULT_SHEBANG, content)
    }
}

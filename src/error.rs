use std::path::PathBuf;
use thiserror::Error;

/// Failures the command boundary needs to tell apart.
#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("operation cancelled")]
    Cancelled,

    #[error("no staged changes found")]
    NoStagedChanges,

    #[error("not a git repository (no .git directory): {}", .0.display())]
    NotGitRepository(PathBuf),

    #[error("GEMINI_API_KEY is not configured; run `commit-assistant config setup` first")]
    MissingApiKey,

    #[error("`{program}` exited with status {code}: {stderr}")]
    CommandFailed {
        program: String,
        code: i32,
        stderr: String,
    },

    #[error("style not found: {0}")]
    StyleNotFound(String),

    #[error("invalid style '{name}': {reason}")]
    InvalidStyle { name: String, reason: String },

    #[error("project config not found at {}; run `commit-assistant install` or `commit-assistant update` first", .0.display())]
    ConfigMissing(PathBuf),

    #[error("the AI model returned no usable text")]
    GenerationFailed,
}

/// Process exit status shared by every command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Success = 0,
    Cancelled = 1,
    Error = 2,
}

impl ExitStatus {
    /// Map an error escaping a command to its exit status.
    pub fn from_error(err: &anyhow::Error) -> Self {
        match err.downcast_ref::<AssistantError>() {
            Some(AssistantError::Cancelled | AssistantError::NoStagedChanges) => {
                ExitStatus::Cancelled
            }
            _ => ExitStatus::Error,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }
}

impl From<ExitStatus> for std::process::ExitCode {
    fn from(status: ExitStatus) -> Self {
        std::process::ExitCode::from(status.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_cancel_maps_to_one() {
        let err = anyhow::Error::new(AssistantError::Cancelled);
        assert_eq!(ExitStatus::from_error(&err), ExitStatus::Cancelled);
        assert_eq!(ExitStatus::from_error(&err).code(), 1);
    }

    #[test]
    fn test_no_staged_changes_maps_to_cancel() {
        let err = anyhow::Error::new(AssistantError::NoStagedChanges);
        assert_eq!(ExitStatus::from_error(&err), ExitStatus::Cancelled);
    }

    #[test]
    fn test_context_does_not_hide_classification() {
        let err: anyhow::Result<()> = Err(AssistantError::Cancelled.into());
        let err = err.context("while editing").unwrap_err();
        assert_eq!(ExitStatus::from_error(&err), ExitStatus::Cancelled);
    }

    #[test]
    fn test_other_errors_map_to_two() {
        let err = anyhow::anyhow!("disk full");
        assert_eq!(ExitStatus::from_error(&err).code(), 2);
        let err = anyhow::Error::new(AssistantError::MissingApiKey);
        assert_eq!(ExitStatus::from_error(&err), ExitStatus::Error);
    }
}

//! Tool error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while registering or executing a tool
///
/// Every variant ends up as the error text of a failed `ToolResult`; none of
/// them abort the conversation.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("tool '{name}' already registered")]
    DuplicateName { name: String },

    #[error("{name} is required")]
    MissingParameter { name: String },

    #[error("{name} must be {expected}")]
    InvalidParameter { name: String, expected: &'static str },

    #[error("directory not found: {}", path.display())]
    DirectoryNotFound { path: PathBuf },

    #[error("path is not a directory: {}", path.display())]
    NotADirectory { path: PathBuf },

    #[error("{0}")]
    InvalidRange(String),

    #[error("invalid regex pattern: {0}")]
    InvalidRegex(String),

    #[error("failed to launch command: {0}")]
    CommandLaunch(#[source] std::io::Error),

    #[error("failed to {action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Failed(String),
}

impl ToolError {
    /// Shorthand for a missing required parameter
    pub fn missing(name: impl Into<String>) -> Self {
        Self::MissingParameter { name: name.into() }
    }

    /// Shorthand for a parameter of the wrong type
    pub fn invalid(name: impl Into<String>, expected: &'static str) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            expected,
        }
    }

    /// Wrap an I/O error with the action and path it happened on
    pub fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }

    /// Whether this error is a contract violation by the caller
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Self::MissingParameter { .. } | Self::InvalidParameter { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_name_message() {
        let err = ToolError::DuplicateName {
            name: "read_file".to_string(),
        };
        assert_eq!(err.to_string(), "tool 'read_file' already registered");
    }

    #[test]
    fn test_missing_parameter_message() {
        let err = ToolError::missing("target_file");
        assert_eq!(err.to_string(), "target_file is required");
        assert!(err.is_contract_violation());
    }

    #[test]
    fn test_io_message_includes_path() {
        let err = ToolError::io(
            "write",
            "/tmp/worktree/out.txt",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );

        let msg = err.to_string();
        assert!(msg.contains("failed to write"));
        assert!(msg.contains("/tmp/worktree/out.txt"));
        assert!(!err.is_contract_violation());
    }
}

//! Error types for rule store mutation and policy file persistence.

use std::path::PathBuf;

/// Errors that can occur while editing, loading or saving rules.
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("Invalid action: {0}. Must be 'allow' or 'deny'")]
    InvalidAction(String),

    #[error("Invalid scope: {0}. Must be 'global' or 'project'")]
    InvalidScope(String),

    #[error("Invalid direction: {0}. Must be 'up', 'down', 'top' or 'bottom'")]
    InvalidDirection(String),

    #[error("Pattern must not be empty")]
    EmptyPattern,

    /// Patterns may use wildcards but never shell metacharacters.
    #[error("Pattern contains dangerous characters: {0}")]
    DangerousPattern(String),

    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Invalid index: {index} ({len} rules)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Rule not found: {0}")]
    RuleNotFound(String),

    #[error("Cannot move up (already at top)")]
    AlreadyAtTop,

    #[error("Cannot move down (already at bottom)")]
    AlreadyAtBottom,

    #[error("Could not determine user config directory")]
    NoConfigDir,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A policy file exists but is not valid JSON of the expected shape.
    #[error("Policy file parse error in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Policy serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result alias for policy operations.
pub type Result<T> = std::result::Result<T, PolicyError>;

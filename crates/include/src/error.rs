//! Failure taxonomy for include resolution.
//!
//! [`IncludeError`] never escapes a render: the expansion loop hands each one
//! to [`crate::marker::render_marker`]. [`RenderError`] is the only error a
//! caller of [`crate::Renderer`] ever sees.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use weave_core::Protocol;
use weave_rules::Reason;

/// Detail carried by a read failure; each variant has distinct marker text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadDetail {
    Directory,
    PermissionDenied,
    InvalidUtf8,
    /// Glob pattern walks out of its base directory.
    GlobTraversal,
    /// Static path walks out of its base directory.
    PathTraversal,
    Io(String),
}

impl fmt::Display for ReadDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadDetail::Directory => f.write_str("path is a directory"),
            ReadDetail::PermissionDenied => f.write_str("permission denied"),
            ReadDetail::InvalidUtf8 => f.write_str("file is not valid UTF-8"),
            ReadDetail::GlobTraversal => {
                f.write_str("path traversal ('..') not allowed in glob pattern")
            }
            ReadDetail::PathTraversal => {
                f.write_str("path traversal ('..') not allowed in static path")
            }
            ReadDetail::Io(msg) => f.write_str(msg),
        }
    }
}

/// Why one directive produced no content.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IncludeError {
    #[error("file not found: {path}")]
    NotFound { path: String },

    #[error("error reading {path}: {detail}")]
    Read { path: String, detail: ReadDetail },

    #[error("error executing '{command}': {detail}")]
    Execution { command: String, detail: String },

    #[error("command timed out after {}s: {command}", .timeout.as_secs())]
    Timeout { command: String, timeout: Duration },

    #[error("blocked by security policy: {reason} [{protocol}: {payload}]")]
    Denied {
        protocol: Protocol,
        payload: String,
        reason: Reason,
    },

    #[error("no files matched pattern: {pattern}")]
    NoMatch { pattern: String },

    #[error("invalid glob '{pattern}': {detail}")]
    GlobPattern { pattern: String, detail: String },

    #[error("max include depth {max_depth} exceeded")]
    DepthExceeded { max_depth: usize },
}

impl IncludeError {
    /// Warnings contribute no content but are not failures.
    pub fn is_warning(&self) -> bool {
        matches!(self, IncludeError::NoMatch { .. })
    }
}

/// Fatal render failure: the top-level document could not be read.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

//! The one place an [`IncludeError`] becomes inline output.

use crate::error::IncludeError;

/// Diagnostic comment substituted for a failed directive.
pub fn render_marker(err: &IncludeError) -> String {
    match err {
        IncludeError::NotFound { path } => format!("<!-- ERROR: File not found: {} -->", path),
        IncludeError::Read { path, detail } => {
            format!("<!-- ERROR reading {}: {} -->", path, detail)
        }
        IncludeError::Execution { command, detail } => {
            format!("<!-- ERROR executing '{}': {} -->", command, detail)
        }
        IncludeError::Timeout { command, .. } => {
            format!("<!-- ERROR: Command timed out: {} -->", command)
        }
        IncludeError::Denied {
            protocol,
            payload,
            reason,
        } => format!(
            "<!-- ERROR: Command blocked by security policy: {} [{}: {}] -->",
            reason, protocol, payload
        ),
        IncludeError::NoMatch { pattern } => {
            format!("<!-- WARNING: No files matched pattern: {} -->", pattern)
        }
        IncludeError::GlobPattern { pattern, detail } => {
            format!("<!-- ERROR resolving glob '{}': {} -->", pattern, detail)
        }
        IncludeError::DepthExceeded { max_depth } => {
            format!("<!-- ERROR: Max include depth {} exceeded -->", max_depth)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReadDetail;
    use std::time::Duration;
    use weave_core::Protocol;
    use weave_rules::Reason;

    #[test]
    fn literal_forms() {
        let cases = [
            (
                IncludeError::NotFound { path: "a.md".into() },
                "<!-- ERROR: File not found: a.md -->",
            ),
            (
                IncludeError::Read {
                    path: "docs".into(),
                    detail: ReadDetail::Directory,
                },
                "<!-- ERROR reading docs: path is a directory -->",
            ),
            (
                IncludeError::Execution {
                    command: "false".into(),
                    detail: "exit status 1".into(),
                },
                "<!-- ERROR executing 'false': exit status 1 -->",
            ),
            (
                IncludeError::Timeout {
                    command: "sleep 60".into(),
                    timeout: Duration::from_secs(30),
                },
                "<!-- ERROR: Command timed out: sleep 60 -->",
            ),
            (
                IncludeError::NoMatch {
                    pattern: "docs/*.md".into(),
                },
                "<!-- WARNING: No files matched pattern: docs/*.md -->",
            ),
            (
                IncludeError::DepthExceeded { max_depth: 10 },
                "<!-- ERROR: Max include depth 10 exceeded -->",
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(render_marker(&err), expected);
        }
    }

    #[test]
    fn denial_names_reason_and_payload() {
        let err = IncludeError::Denied {
            protocol: Protocol::Command,
            payload: "date".into(),
            reason: Reason::NoRules,
        };
        assert_eq!(
            render_marker(&err),
            "<!-- ERROR: Command blocked by security policy: \
             No rules configured (secure by default) [cli: date] -->"
        );
    }

    #[test]
    fn traversal_detail() {
        let err = IncludeError::Read {
            path: "../x/*".into(),
            detail: ReadDetail::GlobTraversal,
        };
        assert_eq!(
            render_marker(&err),
            "<!-- ERROR reading ../x/*: path traversal ('..') not allowed in glob pattern -->"
        );
    }

    #[test]
    fn only_no_match_is_a_warning() {
        assert!(IncludeError::NoMatch { pattern: "*".into() }.is_warning());
        assert!(!IncludeError::DepthExceeded { max_depth: 1 }.is_warning());
    }
}

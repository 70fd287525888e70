//! Protocol resolvers.
//!
//! One resolver per [`Protocol`], selected by an exhaustive match. Resolvers
//! assume the security gate has already allowed the directive.

pub mod command;
pub mod glob;
pub mod static_file;

use std::path::{Path, PathBuf};
use std::time::Duration;

use weave_core::Protocol;

use crate::directive::Directive;
use crate::error::IncludeError;

/// Where a directive is being resolved from.
#[derive(Debug, Clone, Copy)]
pub struct ResolveContext<'a> {
    /// Directory relative static and glob payloads are joined onto.
    pub base_dir: &'a Path,
    /// Current directory for commands.
    pub working_dir: &'a Path,
    pub command_timeout: Duration,
}

/// Text produced by a resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub text: String,
    /// File the text was read from, when it came from exactly one file.
    pub origin: Option<PathBuf>,
}

impl Resolved {
    pub fn text(text: String) -> Self {
        Self { text, origin: None }
    }
}

/// Run the resolver for `directive.protocol`.
pub async fn resolve(
    directive: &Directive,
    ctx: &ResolveContext<'_>,
) -> Result<Resolved, IncludeError> {
    match directive.protocol {
        Protocol::Static => static_file::read(&directive.payload, ctx.base_dir).await,
        Protocol::Command => {
            command::run(&directive.payload, ctx.working_dir, ctx.command_timeout)
                .await
                .map(Resolved::text)
        }
        Protocol::Glob => glob::concatenate(&directive.payload, ctx.base_dir)
            .await
            .map(Resolved::text),
    }
}

/// Join a relative payload onto `base_dir`; absolute payloads stand alone.
pub(crate) fn join_payload(base_dir: &Path, payload: &str) -> PathBuf {
    let path = Path::new(payload);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

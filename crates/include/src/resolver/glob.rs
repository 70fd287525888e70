//! `glob:` expands a pattern and concatenates every matching file.
//!
//! The pattern is split into a literal directory prefix and a wildcard
//! remainder. The prefix is walked with `walkdir`; the remainder is matched
//! with `globset`, where `*` stays within one path component and `**` spans
//! any number of them. Symlinked directories are never descended.
//!
//! The walk is blocking filesystem work, so it runs on tokio's blocking pool.

use std::path::{Component, Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher};
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use super::join_payload;
use super::static_file::io_error;
use crate::error::{IncludeError, ReadDetail};
use crate::marker::render_marker;

const GLOB_META: [char; 4] = ['*', '?', '[', '{'];

/// Separator between the contents of consecutive matched files.
const FILE_SEPARATOR: &str = "\n\n";

/// Resolve `pattern` relative to `base_dir` and join the matched files.
///
/// A matched file that cannot be read contributes an inline read marker in
/// its place; zero matches is [`IncludeError::NoMatch`].
pub async fn concatenate(pattern: &str, base_dir: &Path) -> Result<String, IncludeError> {
    let owned_pattern = pattern.to_string();
    let owned_base = base_dir.to_path_buf();
    let files = tokio::task::spawn_blocking(move || expand(&owned_pattern, &owned_base))
        .await
        .map_err(|e| IncludeError::Read {
            path: pattern.to_string(),
            detail: ReadDetail::Io(format!("glob walk failed: {e}")),
        })??;
    if files.is_empty() {
        return Err(IncludeError::NoMatch {
            pattern: pattern.to_string(),
        });
    }
    debug!(pattern = pattern, matched = files.len(), "glob expanded");

    let mut parts = Vec::with_capacity(files.len());
    for file in &files {
        let shown = file.display().to_string();
        let part = match tokio::fs::read(file).await {
            Ok(bytes) => String::from_utf8(bytes).unwrap_or_else(|_| {
                render_marker(&IncludeError::Read {
                    path: shown,
                    detail: ReadDetail::InvalidUtf8,
                })
            }),
            Err(e) => render_marker(&io_error(&shown, e)),
        };
        parts.push(part);
    }
    Ok(parts.join(FILE_SEPARATOR))
}

/// Files matching `pattern`, sorted by full path.
pub fn expand(pattern: &str, base_dir: &Path) -> Result<Vec<PathBuf>, IncludeError> {
    let raw = Path::new(pattern);
    if raw.components().any(|c| c == Component::ParentDir) {
        return Err(IncludeError::Read {
            path: pattern.to_string(),
            detail: ReadDetail::GlobTraversal,
        });
    }

    // Literal leading components become the walk root.
    let mut prefix = PathBuf::new();
    let mut rest: Vec<String> = Vec::new();
    for component in raw.components() {
        let text = component.as_os_str().to_string_lossy();
        if rest.is_empty() && !text.contains(&GLOB_META[..]) {
            prefix.push(component);
        } else {
            rest.push(text.into_owned());
        }
    }
    let root = if prefix.as_os_str().is_empty() {
        base_dir.to_path_buf()
    } else {
        join_payload(base_dir, &prefix.to_string_lossy())
    };

    if rest.is_empty() {
        // No wildcards at all: the pattern names at most one file.
        return Ok(if root.is_file() { vec![root] } else { Vec::new() });
    }

    let matcher = compile(pattern, &rest.join("/"))?;
    let recursive = rest.iter().any(|c| c.contains("**"));

    let mut walker = WalkDir::new(&root).min_depth(1).follow_links(false);
    if !recursive {
        walker = walker.max_depth(rest.len());
    }

    let mut files = Vec::new();
    let entries = walker.into_iter().filter_entry(|e| {
        e.depth() == 0 || !is_hidden(e) || hidden_allowed(&rest, e.depth())
    });
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!(pattern = pattern, error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if entry.file_type().is_dir() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(&root) else {
            continue;
        };
        if !matcher.is_match(to_slash(relative)) {
            continue;
        }
        // Follows the link: symlinks to regular files count, to directories do not.
        if entry.path().is_file() {
            files.push(entry.into_path());
        }
    }

    files.sort_by(|a, b| a.to_string_lossy().cmp(&b.to_string_lossy()));
    Ok(files)
}

fn compile(pattern: &str, relative: &str) -> Result<GlobMatcher, IncludeError> {
    GlobBuilder::new(relative)
        .literal_separator(true)
        .build()
        .map(|glob| glob.compile_matcher())
        .map_err(|e| IncludeError::GlobPattern {
            pattern: pattern.to_string(),
            detail: e.kind().to_string(),
        })
}

/// Whether a dot-prefixed entry at walk `depth` may be visited.
///
/// Components before the first `**` line up with walk depth, and only a
/// component that itself starts with `.` admits a hidden entry there. Below
/// a `**` the depth is unknown, so any dot-prefixed component after it counts.
fn hidden_allowed(rest: &[String], depth: usize) -> bool {
    let fixed = rest.iter().take_while(|c| !c.contains("**")).count();
    if depth <= fixed {
        return rest[depth - 1].starts_with('.');
    }
    rest[fixed..].iter().any(|c| c.starts_with('.'))
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

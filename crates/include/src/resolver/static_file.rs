//! `static:` reads one file as text.

use std::io;
use std::path::{Component, Path};

use tracing::debug;

use super::{join_payload, Resolved};
use crate::error::{IncludeError, ReadDetail};

/// Read `payload` relative to `base_dir`.
///
/// Markers name the path as written in the directive. A `..` component is
/// rejected: rules match the payload text, so `docs/*` must not reach
/// `docs/../secret`.
pub async fn read(payload: &str, base_dir: &Path) -> Result<Resolved, IncludeError> {
    if Path::new(payload)
        .components()
        .any(|c| c == Component::ParentDir)
    {
        return Err(read_error(payload, ReadDetail::PathTraversal));
    }

    let path = join_payload(base_dir, payload);
    debug!(path = %path.display(), "reading static include");

    let metadata = tokio::fs::metadata(&path)
        .await
        .map_err(|e| io_error(payload, e))?;
    if metadata.is_dir() {
        return Err(read_error(payload, ReadDetail::Directory));
    }

    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| io_error(payload, e))?;
    let text =
        String::from_utf8(bytes).map_err(|_| read_error(payload, ReadDetail::InvalidUtf8))?;

    Ok(Resolved {
        text,
        origin: Some(path),
    })
}

pub(crate) fn io_error(path: &str, err: io::Error) -> IncludeError {
    match err.kind() {
        io::ErrorKind::NotFound => IncludeError::NotFound {
            path: path.to_string(),
        },
        io::ErrorKind::PermissionDenied => read_error(path, ReadDetail::PermissionDenied),
        _ => read_error(path, ReadDetail::Io(err.to_string())),
    }
}

fn read_error(path: &str, detail: ReadDetail) -> IncludeError {
    IncludeError::Read {
        path: path.to_string(),
        detail,
    }
}

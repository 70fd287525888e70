//! Top-level entry point: one rule snapshot and one config per renderer.

use std::path::{Path, PathBuf};

use tracing::info;
use weave_core::RenderConfig;
use weave_rules::MergedRules;

use crate::error::RenderError;
use crate::expand::{ExpansionContext, Expander};

/// Renders templates against a fixed rule snapshot.
///
/// The snapshot is taken by the caller (`RuleStore::snapshot`) before
/// rendering; later rule mutations do not affect this renderer.
#[derive(Debug, Clone)]
pub struct Renderer {
    rules: MergedRules,
    config: RenderConfig,
    working_dir: PathBuf,
}

impl Renderer {
    /// Commands run in the process's current directory unless
    /// [`with_working_dir`](Self::with_working_dir) says otherwise.
    pub fn new(rules: MergedRules, config: RenderConfig) -> Self {
        let working_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            rules,
            config,
            working_dir,
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn rules(&self) -> &MergedRules {
        &self.rules
    }

    /// Read and expand a document. Failing to read `path` itself is the only
    /// error; everything below it is reported inline.
    pub async fn render_file(&self, path: &Path) -> Result<String, RenderError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| RenderError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        info!(path = %path.display(), "rendering document");
        Ok(self.render_str(&content, Some(path)).await)
    }

    /// Expand in-memory text. Without an origin, relative paths resolve
    /// against the working directory.
    pub async fn render_str(&self, content: &str, origin: Option<&Path>) -> String {
        let ctx = ExpansionContext::root(origin, &self.working_dir, self.config.max_include_depth);
        Expander::new(&self.rules, &self.config)
            .expand(content, ctx)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use weave_core::Protocol;
    use weave_rules::Rule;

    #[tokio::test]
    async fn missing_document_is_fatal() {
        let dir = TempDir::new().unwrap();
        let renderer = Renderer::new(MergedRules::default(), RenderConfig::default());
        let err = renderer
            .render_file(&dir.path().join("absent.gtext"))
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::Read { .. }));
    }

    #[tokio::test]
    async fn render_str_uses_working_dir_without_origin() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.md"), "A").unwrap();
        let rules = MergedRules::from_lists([(Protocol::Static, vec![Rule::allow("a.md")])]);
        let renderer =
            Renderer::new(rules, RenderConfig::default()).with_working_dir(dir.path());

        let out = renderer.render_str("```include\na.md\n```", None).await;
        assert_eq!(out, "A");
    }
}

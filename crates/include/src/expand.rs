//! Expansion controller: parser, gate and resolvers driven over an explicit
//! stack of frames.
//!
//! Each frame is one piece of text being expanded at a given depth. An
//! `expand` directive pushes a child frame holding its resolved output; the
//! child's result is spliced into the parent when its work runs out. Stack
//! height is bounded by `max_depth + 1`, so the bound is enforced by the data
//! structure rather than by call recursion.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, warn};
use weave_core::RenderConfig;
use weave_rules::MergedRules;

use crate::directive::{parse_template, Directive, Segment};
use crate::error::IncludeError;
use crate::marker::render_marker;
use crate::resolver::{self, ResolveContext};

/// Separator between the outputs of directives in one include block.
const DIRECTIVE_SEPARATOR: &str = "\n";

/// Where a piece of text sits in the expansion tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpansionContext {
    pub depth: usize,
    pub max_depth: usize,
    /// File the text came from; relative paths resolve against its directory.
    pub origin: Option<PathBuf>,
    /// Current directory for commands, and the base when there is no origin.
    pub working_dir: PathBuf,
}

impl ExpansionContext {
    /// Context for a top-level document.
    pub fn root(origin: Option<&Path>, working_dir: &Path, max_depth: usize) -> Self {
        Self {
            depth: 0,
            max_depth,
            origin: origin.map(Path::to_path_buf),
            working_dir: working_dir.to_path_buf(),
        }
    }

    /// Directory relative `static:` and `glob:` payloads are joined onto.
    pub fn base_dir(&self) -> PathBuf {
        match self.origin.as_deref().and_then(Path::parent) {
            Some(parent) if parent.as_os_str().is_empty() => PathBuf::from("."),
            Some(parent) => parent.to_path_buf(),
            None => self.working_dir.clone(),
        }
    }

    /// No further `expand` directive may be resolved at this depth.
    pub fn at_limit(&self) -> bool {
        self.depth >= self.max_depth
    }

    /// Child context one level down; output without its own file keeps the
    /// parent's origin.
    fn nested(&self, origin: Option<PathBuf>) -> Self {
        Self {
            depth: self.depth + 1,
            max_depth: self.max_depth,
            origin: origin.or_else(|| self.origin.clone()),
            working_dir: self.working_dir.clone(),
        }
    }
}

enum Item {
    Text(String),
    Directive(Directive),
}

struct Frame {
    pending: VecDeque<Item>,
    output: String,
    ctx: ExpansionContext,
}

impl Frame {
    fn new(content: &str, ctx: ExpansionContext) -> Self {
        let mut pending = VecDeque::new();
        for segment in parse_template(content) {
            match segment {
                Segment::Text(text) => pending.push_back(Item::Text(text)),
                Segment::Block(directives) => {
                    for (i, directive) in directives.into_iter().enumerate() {
                        if i > 0 {
                            pending.push_back(Item::Text(DIRECTIVE_SEPARATOR.to_string()));
                        }
                        pending.push_back(Item::Directive(directive));
                    }
                }
            }
        }
        Self {
            pending,
            output: String::with_capacity(content.len()),
            ctx,
        }
    }
}

enum Step {
    /// Final text for the directive.
    Emit(String),
    /// Expand this text one level down before splicing it in.
    Descend(String, ExpansionContext),
}

/// Resolves every include block in a text against one rule snapshot.
pub struct Expander<'a> {
    rules: &'a MergedRules,
    command_timeout: Duration,
}

impl<'a> Expander<'a> {
    pub fn new(rules: &'a MergedRules, config: &RenderConfig) -> Self {
        Self {
            rules,
            command_timeout: config.command_timeout(),
        }
    }

    /// Expand `content`, resolving directives strictly in source order.
    ///
    /// Never fails: every per-directive problem is spliced in as a marker.
    pub async fn expand(&self, content: &str, ctx: ExpansionContext) -> String {
        let mut stack = vec![Frame::new(content, ctx)];

        loop {
            let Some(frame) = stack.last_mut() else {
                return String::new();
            };
            match frame.pending.pop_front() {
                Some(Item::Text(text)) => frame.output.push_str(&text),
                Some(Item::Directive(directive)) => {
                    let ctx = frame.ctx.clone();
                    match self.step(&directive, &ctx).await {
                        Step::Emit(text) => {
                            if let Some(frame) = stack.last_mut() {
                                frame.output.push_str(&text);
                            }
                        }
                        Step::Descend(text, child) => stack.push(Frame::new(&text, child)),
                    }
                }
                None => {
                    let Some(done) = stack.pop() else {
                        return String::new();
                    };
                    match stack.last_mut() {
                        Some(parent) => parent.output.push_str(&done.output),
                        None => return done.output,
                    }
                }
            }
        }
    }

    async fn step(&self, directive: &Directive, ctx: &ExpansionContext) -> Step {
        if directive.expands() && ctx.at_limit() {
            warn!(
                directive = %directive,
                line = directive.line,
                max_depth = ctx.max_depth,
                "max include depth reached"
            );
            return Step::Emit(render_marker(&IncludeError::DepthExceeded {
                max_depth: ctx.max_depth,
            }));
        }

        let verdict = self.rules.evaluate(directive.protocol, &directive.payload);
        if !verdict.is_allowed() {
            warn!(
                protocol = %directive.protocol,
                payload = %directive.payload,
                reason = %verdict.reason,
                line = directive.line,
                "directive blocked by security policy"
            );
            return Step::Emit(render_marker(&IncludeError::Denied {
                protocol: directive.protocol,
                payload: directive.payload.clone(),
                reason: verdict.reason,
            }));
        }

        debug!(
            protocol = %directive.protocol,
            payload = %directive.payload,
            depth = ctx.depth,
            line = directive.line,
            "resolving directive"
        );

        let base_dir = ctx.base_dir();
        let resolve_ctx = ResolveContext {
            base_dir: &base_dir,
            working_dir: &ctx.working_dir,
            command_timeout: self.command_timeout,
        };
        match resolver::resolve(directive, &resolve_ctx).await {
            Ok(resolved) if directive.expands() => {
                Step::Descend(resolved.text, ctx.nested(resolved.origin))
            }
            Ok(resolved) => Step::Emit(resolved.text),
            Err(err) => {
                if err.is_warning() {
                    debug!(error = %err, "directive produced no content");
                } else {
                    debug!(error = %err, line = directive.line, "directive failed");
                }
                Step::Emit(render_marker(&err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;
    use weave_core::Protocol;
    use weave_rules::Rule;

    fn allow_static() -> MergedRules {
        MergedRules::from_lists([(Protocol::Static, vec![Rule::allow("*")])])
    }

    async fn run(rules: &MergedRules, dir: &Path, content: &str, max_depth: usize) -> String {
        let config = RenderConfig::default().with_max_include_depth(max_depth);
        let ctx = ExpansionContext::root(Some(&dir.join("doc.gtext")), dir, max_depth);
        Expander::new(rules, &config).expand(content, ctx).await
    }

    #[tokio::test]
    async fn text_without_blocks_is_unchanged() {
        let dir = TempDir::new().unwrap();
        let content = "plain\n```rust\nx\n```\n";
        assert_eq!(run(&allow_static(), dir.path(), content, 10).await, content);
    }

    #[tokio::test]
    async fn block_outputs_joined_by_newline() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.md"), "A").unwrap();
        fs::write(dir.path().join("b.md"), "B").unwrap();

        let out = run(
            &allow_static(),
            dir.path(),
            "<\n```include\na.md\n\nb.md\n```\n>",
            10,
        )
        .await;
        assert_eq!(out, "<\nA\nB\n>");
    }

    #[tokio::test]
    async fn non_expand_output_is_not_re_resolved() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("inner.md"), "INNER").unwrap();
        fs::write(dir.path().join("outer.md"), "```include\ninner.md\n```").unwrap();

        let out = run(&allow_static(), dir.path(), "```include\nouter.md\n```", 10).await;
        assert_eq!(out, "```include\ninner.md\n```");

        let out = run(
            &allow_static(),
            dir.path(),
            "```include\n:expand:outer.md\n```",
            10,
        )
        .await;
        assert_eq!(out, "INNER");
    }

    #[tokio::test]
    async fn nested_static_resolves_against_included_file() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/part.md"), "```include\nleaf.md\n```").unwrap();
        fs::write(dir.path().join("sub/leaf.md"), "LEAF").unwrap();

        let out = run(
            &allow_static(),
            dir.path(),
            "```include\n:expand:static: sub/part.md\n```",
            10,
        )
        .await;
        assert_eq!(out, "LEAF");
    }

    #[tokio::test]
    async fn depth_limit_emits_one_marker() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("loop.md"), "x```include\n:expand:loop.md\n```").unwrap();

        let out = run(&allow_static(), dir.path(), "```include\n:expand:loop.md\n```", 3).await;
        assert_eq!(out, "xxx<!-- ERROR: Max include depth 3 exceeded -->");
    }

    #[tokio::test]
    async fn zero_depth_blocks_every_expand() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.md"), "A").unwrap();

        let out = run(
            &allow_static(),
            dir.path(),
            "```include\n:expand:a.md\na.md\n```",
            0,
        )
        .await;
        assert_eq!(out, "<!-- ERROR: Max include depth 0 exceeded -->\nA");
    }

    #[tokio::test]
    async fn denial_is_inline_and_render_continues() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.md"), "A").unwrap();

        let out = run(
            &allow_static(),
            dir.path(),
            "```include\nglob: *.md\na.md\n```",
            10,
        )
        .await;
        assert_eq!(
            out,
            "<!-- ERROR: Command blocked by security policy: \
             No rules configured (secure by default) [glob: *.md] -->\nA"
        );
    }

    #[test]
    fn base_dir_falls_back_to_working_dir() {
        let ctx = ExpansionContext::root(None, Path::new("/work"), 10);
        assert_eq!(ctx.base_dir(), PathBuf::from("/work"));

        let ctx = ExpansionContext::root(Some(Path::new("doc.gtext")), Path::new("/work"), 10);
        assert_eq!(ctx.base_dir(), PathBuf::from("."));

        let ctx = ExpansionContext::root(Some(Path::new("/site/doc.gtext")), Path::new("/work"), 10);
        assert_eq!(ctx.base_dir(), PathBuf::from("/site"));
    }

    #[test]
    fn nested_keeps_origin_without_a_file() {
        let ctx = ExpansionContext::root(Some(Path::new("/site/doc.gtext")), Path::new("/w"), 10);
        let child = ctx.nested(None);
        assert_eq!(child.depth, 1);
        assert_eq!(child.base_dir(), PathBuf::from("/site"));

        let child = ctx.nested(Some(PathBuf::from("/other/part.md")));
        assert_eq!(child.base_dir(), PathBuf::from("/other"));
    }
}

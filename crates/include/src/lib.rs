//! Include-block expansion for text templates.
//!
//! A template embeds fenced blocks:
//!
//! ````text
//! ```include
//! static: header.md
//! cli: git describe --tags
//! :expand:glob: sections/*.md
//! ```
//! ````
//!
//! Each line is a directive. Every directive is checked by the security gate
//! from `weave-rules` before its resolver runs, and every failure becomes an
//! inline diagnostic marker instead of aborting the render.

pub mod directive;
pub mod error;
pub mod expand;
pub mod marker;
pub mod render;
pub mod resolver;

pub use directive::{parse_line, parse_template, Directive, Modifier, Segment};
pub use error::{IncludeError, ReadDetail, RenderError};
pub use expand::{ExpansionContext, Expander};
pub use marker::render_marker;
pub use render::Renderer;
pub use resolver::{Resolved, ResolveContext};

//! Ordered allow/deny policy for include directives.
//!
//! This crate provides:
//! - [`Rule`] records grouped per scope (global, project) and per protocol
//! - [`RuleStore`] mutation primitives (append, remove, move, clear) and merging
//! - [`gate::evaluate`], the first-match, default-deny decision function with
//!   an unconditional shell-metacharacter block for command payloads
//! - JSON persistence of each scope's policy file

pub mod error;
pub mod gate;
pub mod matcher;
pub mod persist;
pub mod rule;
pub mod store;

pub use error::{PolicyError, Result};
pub use gate::{evaluate, MatchKind, Reason, Verdict, SHELL_METACHARACTERS};
pub use persist::PolicyPaths;
pub use rule::{Action, Direction, Rule, RuleRef, Scope};
pub use store::{MergedRules, RuleSet, RuleStore, ScopeRules};

//! Rule records and the small enums used to address and reorder them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PolicyError;

/// What happens to a payload whose first matching rule is this one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Allow,
    Deny,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Allow => write!(f, "allow"),
            Action::Deny => write!(f, "deny"),
        }
    }
}

impl FromStr for Action {
    type Err = PolicyError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "allow" => Ok(Action::Allow),
            "deny" => Ok(Action::Deny),
            other => Err(PolicyError::InvalidAction(other.to_string())),
        }
    }
}

/// A single `(pattern, action)` entry, optionally named for removal/moves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Exact text or wildcard expression (`*`, `?`, `[...]`).
    pub pattern: String,
    pub action: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Rule {
    pub fn new(pattern: impl Into<String>, action: Action) -> Self {
        Self {
            pattern: pattern.into(),
            action,
            name: None,
        }
    }

    pub fn allow(pattern: impl Into<String>) -> Self {
        Self::new(pattern, Action::Allow)
    }

    pub fn deny(pattern: impl Into<String>) -> Self {
        Self::new(pattern, Action::Deny)
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Where a rule lives. Global rules are always evaluated before project rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Global,
    Project,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Global => write!(f, "global"),
            Scope::Project => write!(f, "project"),
        }
    }
}

impl FromStr for Scope {
    type Err = PolicyError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "global" => Ok(Scope::Global),
            "project" => Ok(Scope::Project),
            other => Err(PolicyError::InvalidScope(other.to_string())),
        }
    }
}

/// Addresses a rule inside one rule list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleRef {
    Index(usize),
    /// Targets the first rule carrying this name.
    Name(String),
}

impl RuleRef {
    /// An all-digit identifier is an index, anything else is a name.
    pub fn parse(identifier: &str) -> Self {
        match identifier.parse::<usize>() {
            Ok(index) => RuleRef::Index(index),
            Err(_) => RuleRef::Name(identifier.to_string()),
        }
    }
}

impl fmt::Display for RuleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleRef::Index(i) => write!(f, "#{}", i),
            RuleRef::Name(n) => write!(f, "'{}'", n),
        }
    }
}

/// Reordering target for [`RuleStore::move_rule`](crate::RuleStore::move_rule).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Top,
    Bottom,
}

impl FromStr for Direction {
    type Err = PolicyError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            "top" => Ok(Direction::Top),
            "bottom" => Ok(Direction::Bottom),
            other => Err(PolicyError::InvalidDirection(other.to_string())),
        }
    }
}

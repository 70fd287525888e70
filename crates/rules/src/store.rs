//! [`RuleStore`]: two scopes of ordered per-protocol rule lists.
//!
//! The store only holds data and enforces insertion-order invariants; it does
//! not decide anything. Call [`RuleStore::snapshot`] once per render and hand
//! the resulting [`MergedRules`] to the renderer.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;
use weave_core::Protocol;

use crate::error::{PolicyError, Result};
use crate::gate::{self, find_metacharacter, Verdict};
use crate::matcher;
use crate::rule::{Action, Direction, Rule, RuleRef, Scope};

// ── Rule lists ──────────────────────────────────────────────────────

/// Ordered rule list for one (scope, protocol) pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    #[serde(default)]
    pub rules: Vec<Rule>,
}

impl RuleSet {
    fn position(&self, target: &RuleRef) -> Result<usize> {
        let found = match target {
            RuleRef::Index(index) => Some(*index).filter(|i| *i < self.rules.len()),
            RuleRef::Name(name) => self
                .rules
                .iter()
                .position(|r| r.name.as_deref() == Some(name.as_str())),
        };
        found.ok_or_else(|| missing_rule(target, self.rules.len()))
    }
}

fn missing_rule(target: &RuleRef, len: usize) -> PolicyError {
    match target {
        RuleRef::Index(index) => PolicyError::IndexOutOfRange { index: *index, len },
        RuleRef::Name(name) => PolicyError::RuleNotFound(name.clone()),
    }
}

/// All rule lists of one scope, keyed by protocol.
///
/// Serializes to the policy file shape
/// `{ "cli": { "rules": [ { "pattern": .., "action": .., "name": .. } ] } }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeRules {
    protocols: BTreeMap<Protocol, RuleSet>,
}

impl ScopeRules {
    pub fn rules(&self, protocol: Protocol) -> &[Rule] {
        self.protocols
            .get(&protocol)
            .map(|set| set.rules.as_slice())
            .unwrap_or(&[])
    }

    fn rule_set_mut(&mut self, protocol: Protocol) -> &mut RuleSet {
        self.protocols.entry(protocol).or_default()
    }

    /// Existing list plus the position of `target` in it.
    fn locate(&mut self, protocol: Protocol, target: &RuleRef) -> Result<(&mut RuleSet, usize)> {
        match self.protocols.get_mut(&protocol) {
            Some(set) => {
                let index = set.position(target)?;
                Ok((set, index))
            }
            None => Err(missing_rule(target, 0)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.protocols.values().all(|set| set.rules.is_empty())
    }
}

// ── Store ───────────────────────────────────────────────────────────

/// Global and project rule scopes.
///
/// Single-writer: mutate between renders, never during one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleStore {
    global: ScopeRules,
    project: ScopeRules,
}

impl RuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_scopes(global: ScopeRules, project: ScopeRules) -> Self {
        Self { global, project }
    }

    pub fn scope(&self, scope: Scope) -> &ScopeRules {
        match scope {
            Scope::Global => &self.global,
            Scope::Project => &self.project,
        }
    }

    fn scope_mut(&mut self, scope: Scope) -> &mut ScopeRules {
        match scope {
            Scope::Global => &mut self.global,
            Scope::Project => &mut self.project,
        }
    }

    /// Ordered rules of one scope for display.
    pub fn list(&self, scope: Scope, protocol: Protocol) -> &[Rule] {
        self.scope(scope).rules(protocol)
    }

    /// Append a rule at the end of the list. Returns its index.
    ///
    /// Rejects empty patterns, patterns containing shell metacharacters and
    /// wildcard patterns that do not compile.
    pub fn append(
        &mut self,
        scope: Scope,
        protocol: Protocol,
        pattern: &str,
        action: Action,
        name: Option<&str>,
    ) -> Result<usize> {
        validate_pattern(pattern)?;

        let rule = Rule {
            pattern: pattern.to_string(),
            action,
            name: name.filter(|n| !n.is_empty()).map(str::to_string),
        };
        let set = self.scope_mut(scope).rule_set_mut(protocol);
        set.rules.push(rule);
        let index = set.rules.len() - 1;

        info!(%scope, %protocol, pattern, %action, index, "rule added");
        Ok(index)
    }

    /// Remove a rule by index or by (first matching) name.
    pub fn remove(&mut self, scope: Scope, protocol: Protocol, target: &RuleRef) -> Result<Rule> {
        let (set, index) = self.scope_mut(scope).locate(protocol, target)?;
        let removed = set.rules.remove(index);

        info!(%scope, %protocol, index, pattern = %removed.pattern, "rule removed");
        Ok(removed)
    }

    /// Reorder a rule. Returns its new index.
    ///
    /// Fails without touching the list when the target is missing or the move
    /// would be a no-op at either end.
    pub fn move_rule(
        &mut self,
        scope: Scope,
        protocol: Protocol,
        target: &RuleRef,
        direction: Direction,
    ) -> Result<usize> {
        let (set, index) = self.scope_mut(scope).locate(protocol, target)?;
        let last = set.rules.len() - 1;

        let new_index = match direction {
            Direction::Up | Direction::Top if index == 0 => return Err(PolicyError::AlreadyAtTop),
            Direction::Down | Direction::Bottom if index == last => {
                return Err(PolicyError::AlreadyAtBottom)
            }
            Direction::Up => index - 1,
            Direction::Down => index + 1,
            Direction::Top => 0,
            Direction::Bottom => last,
        };

        let rule = set.rules.remove(index);
        set.rules.insert(new_index, rule);

        info!(%scope, %protocol, from = index, to = new_index, "rule moved");
        Ok(new_index)
    }

    /// Drop every rule of one (scope, protocol) list. Returns how many were removed.
    pub fn clear(&mut self, scope: Scope, protocol: Protocol) -> usize {
        let removed = match self.scope_mut(scope).protocols.get_mut(&protocol) {
            Some(set) => std::mem::take(&mut set.rules).len(),
            None => 0,
        };

        info!(%scope, %protocol, removed, "rules cleared");
        removed
    }

    /// Global rules followed by project rules, order preserved.
    pub fn merge(&self, protocol: Protocol) -> Vec<Rule> {
        self.global
            .rules(protocol)
            .iter()
            .chain(self.project.rules(protocol))
            .cloned()
            .collect()
    }

    /// Merged lists of every protocol, taken once per render.
    pub fn snapshot(&self) -> MergedRules {
        let by_protocol = Protocol::ALL
            .iter()
            .map(|p| (*p, self.merge(*p)))
            .collect();
        MergedRules { by_protocol }
    }
}

fn validate_pattern(pattern: &str) -> Result<()> {
    if pattern.trim().is_empty() {
        return Err(PolicyError::EmptyPattern);
    }
    if find_metacharacter(pattern).is_some() {
        return Err(PolicyError::DangerousPattern(pattern.to_string()));
    }
    if matcher::is_wildcard(pattern) {
        matcher::compile(pattern).map_err(|e| PolicyError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
    }
    Ok(())
}

// ── Merged view ─────────────────────────────────────────────────────

/// Immutable snapshot of `global ++ project` for every protocol.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergedRules {
    by_protocol: BTreeMap<Protocol, Vec<Rule>>,
}

impl MergedRules {
    /// Build a snapshot directly from per-protocol lists (mostly for tests).
    pub fn from_lists<I>(lists: I) -> Self
    where
        I: IntoIterator<Item = (Protocol, Vec<Rule>)>,
    {
        Self {
            by_protocol: lists.into_iter().collect(),
        }
    }

    pub fn rules(&self, protocol: Protocol) -> &[Rule] {
        self.by_protocol
            .get(&protocol)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Run the gate against this snapshot.
    pub fn evaluate(&self, protocol: Protocol, payload: &str) -> Verdict {
        gate::evaluate(protocol, payload, self.rules(protocol))
    }
}

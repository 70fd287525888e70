//! Security gate: the first-match, default-deny decision function.
//!
//! [`evaluate`] is pure. It never mutates rule state and never fails: an
//! invalid wildcard simply does not match. Callers turn a deny into an inline
//! diagnostic and keep rendering.

use std::fmt;

use weave_core::Protocol;

use crate::matcher;
use crate::rule::{Action, Rule};

/// Characters that block a command payload before any rule is consulted.
///
/// Not overridable: an `allow "*"` rule does not re-enable them.
pub const SHELL_METACHARACTERS: [char; 9] = [';', '&', '|', '$', '`', '>', '<', '\n', '\r'];

/// First shell metacharacter found anywhere in `payload`.
pub fn find_metacharacter(payload: &str) -> Option<char> {
    payload.chars().find(|c| SHELL_METACHARACTERS.contains(c))
}

/// How the deciding rule matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// Pattern has no wildcards and equals the payload.
    Exact,
    Wildcard,
}

/// Why the gate reached its decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reason {
    /// Command payload contains a blocked character.
    Metacharacter(char),
    /// The merged list for this protocol is empty.
    NoRules,
    /// Rules exist but none matched.
    NoMatch,
    /// The lowest-indexed matching rule decided.
    Matched {
        index: usize,
        rule: Rule,
        kind: MatchKind,
    },
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Markers are single-line: the character is kept in the variant only.
            Reason::Metacharacter(_) => write!(f, "Contains dangerous shell metacharacters"),
            Reason::NoRules => write!(f, "No rules configured (secure by default)"),
            Reason::NoMatch => write!(f, "No matching rule (secure by default)"),
            Reason::Matched { index, rule, kind } => {
                write!(f, "Rule #{}", index)?;
                if let Some(name) = &rule.name {
                    write!(f, " ({})", name)?;
                }
                match kind {
                    MatchKind::Exact => write!(f, ": exact match '{}'", rule.pattern)?,
                    MatchKind::Wildcard => write!(f, ": pattern '{}'", rule.pattern)?,
                }
                write!(f, " -> {}", rule.action)
            }
        }
    }
}

/// Outcome of [`evaluate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub action: Action,
    pub reason: Reason,
}

impl Verdict {
    fn deny(reason: Reason) -> Self {
        Self {
            action: Action::Deny,
            reason,
        }
    }

    pub fn is_allowed(&self) -> bool {
        self.action == Action::Allow
    }

    /// Index and rule that decided, if any rule matched.
    pub fn matched_rule(&self) -> Option<(usize, &Rule)> {
        match &self.reason {
            Reason::Matched { index, rule, .. } => Some((*index, rule)),
            _ => None,
        }
    }
}

/// Decide whether `payload` may be resolved with `protocol`.
///
/// 1. Command payloads containing any of [`SHELL_METACHARACTERS`] are denied.
/// 2. Otherwise rules are scanned in order; the first match decides.
/// 3. No match (or no rules at all) denies.
pub fn evaluate(protocol: Protocol, payload: &str, rules: &[Rule]) -> Verdict {
    if protocol == Protocol::Command {
        if let Some(c) = find_metacharacter(payload) {
            return Verdict::deny(Reason::Metacharacter(c));
        }
    }

    if rules.is_empty() {
        return Verdict::deny(Reason::NoRules);
    }

    for (index, rule) in rules.iter().enumerate() {
        if let Some(kind) = match_rule(&rule.pattern, payload) {
            return Verdict {
                action: rule.action,
                reason: Reason::Matched {
                    index,
                    rule: rule.clone(),
                    kind,
                },
            };
        }
    }

    Verdict::deny(Reason::NoMatch)
}

fn match_rule(pattern: &str, payload: &str) -> Option<MatchKind> {
    if pattern == payload {
        return Some(MatchKind::Exact);
    }
    if matcher::is_wildcard(pattern) && matcher::matches(pattern, payload) {
        return Some(MatchKind::Wildcard);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_rules_denies() {
        let verdict = evaluate(Protocol::Command, "date", &[]);
        assert!(!verdict.is_allowed());
        assert_eq!(verdict.reason, Reason::NoRules);
        assert_eq!(
            verdict.reason.to_string(),
            "No rules configured (secure by default)"
        );
    }

    #[test]
    fn exact_allow() {
        let rules = vec![Rule::allow("date")];
        let verdict = evaluate(Protocol::Command, "date", &rules);
        assert!(verdict.is_allowed());
        assert_eq!(
            verdict.reason.to_string(),
            "Rule #0: exact match 'date' -> allow"
        );
    }

    #[test]
    fn no_matching_rule_denies() {
        let rules = vec![Rule::allow("date")];
        let verdict = evaluate(Protocol::Command, "ls", &rules);
        assert!(!verdict.is_allowed());
        assert_eq!(verdict.reason, Reason::NoMatch);
        assert!(verdict.matched_rule().is_none());
    }

    #[test]
    fn first_match_wins() {
        let rules = vec![Rule::deny("git push*").named("no-push"), Rule::allow("git *")];

        let pushed = evaluate(Protocol::Command, "git push origin main", &rules);
        assert!(!pushed.is_allowed());
        assert_eq!(pushed.matched_rule().map(|(i, _)| i), Some(0));
        assert_eq!(
            pushed.reason.to_string(),
            "Rule #0 (no-push): pattern 'git push*' -> deny"
        );

        let status = evaluate(Protocol::Command, "git status", &rules);
        assert!(status.is_allowed());
        assert_eq!(status.matched_rule().map(|(i, _)| i), Some(1));
    }

    #[test]
    fn metacharacters_beat_allow_all() {
        let rules = vec![Rule::allow("*")];
        for payload in [
            "ls; rm -rf /",
            "a && b",
            "cat x | wc",
            "echo $HOME",
            "echo `id`",
            "echo x > out",
            "wc < in",
            "echo a\nrm b",
            "echo a\rb",
        ] {
            let verdict = evaluate(Protocol::Command, payload, &rules);
            assert!(!verdict.is_allowed(), "payload {:?} should be blocked", payload);
            assert!(matches!(verdict.reason, Reason::Metacharacter(_)));
        }
    }

    #[test]
    fn metacharacter_reason_wording() {
        let rules = vec![Rule::allow("*")];
        for payload in ["echo a;b", "echo a\nb"] {
            let verdict = evaluate(Protocol::Command, payload, &rules);
            assert_eq!(
                verdict.reason.to_string(),
                "Contains dangerous shell metacharacters"
            );
        }
    }

    #[test]
    fn metacharacter_scan_covers_whole_command_line() {
        // Blocked even though the matching rule only names the prefix.
        let rules = vec![Rule::allow("echo hello")];
        let verdict = evaluate(Protocol::Command, "echo hello;", &rules);
        assert_eq!(verdict.reason, Reason::Metacharacter(';'));
    }

    #[test]
    fn metacharacter_check_only_applies_to_commands() {
        let rules = vec![Rule::allow("*")];
        let verdict = evaluate(Protocol::Static, "notes/a&b.md", &rules);
        assert!(verdict.is_allowed());
    }

    #[test]
    fn exact_match_takes_literal_brackets() {
        // Exact comparison is tried before wildcard interpretation.
        let rules = vec![Rule::allow("file[1].txt")];
        assert!(evaluate(Protocol::Static, "file[1].txt", &rules).is_allowed());
        assert!(evaluate(Protocol::Static, "file1.txt", &rules).is_allowed());
    }

    #[test]
    fn pattern_matching_is_case_sensitive() {
        let rules = vec![Rule::allow("date")];
        assert!(!evaluate(Protocol::Command, "Date", &rules).is_allowed());
        assert!(!evaluate(Protocol::Command, "DATE", &rules).is_allowed());
    }

    #[test]
    fn non_wildcard_pattern_does_not_prefix_match() {
        let rules = vec![Rule::allow("echo")];
        assert!(!evaluate(Protocol::Command, "echo hi", &rules).is_allowed());
    }

    #[test]
    fn invalid_wildcard_is_skipped() {
        let rules = vec![Rule::allow("[z-a]*"), Rule::deny("*")];
        let verdict = evaluate(Protocol::Static, "zebra", &rules);
        assert_eq!(verdict.matched_rule().map(|(i, _)| i), Some(1));
    }
}

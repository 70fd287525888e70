//! Wildcard patterns for rule matching.
//!
//! Semantics follow classic shell `fnmatch`: `*` matches any run of
//! characters (including `/`), `?` matches exactly one character and
//! `[...]` is a character class, negated with a leading `!`. Matching is
//! case-sensitive and anchored at both ends. A pattern with none of the three
//! wildcard characters is plain text and only matches itself.
//!
//! These are not path globs, so `globset` (used for `glob:` file expansion)
//! does not fit: it rejects `**` inside a component (`git push**`), errors on
//! an unclosed `[`, treats `{a,b}` as alternation and `\` as an escape. Here
//! all of those are plain text, so patterns are translated to `regex` instead.

use regex::Regex;

const WILDCARD_CHARS: [char; 3] = ['*', '?', '['];

/// Returns `true` if the pattern uses any wildcard syntax.
pub fn is_wildcard(pattern: &str) -> bool {
    pattern.contains(&WILDCARD_CHARS[..])
}

/// Compile a wildcard pattern into an anchored regex.
pub fn compile(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&translate(pattern))
}

/// Returns `true` if `candidate` matches `pattern`.
///
/// Invalid patterns never match.
pub fn matches(pattern: &str, candidate: &str) -> bool {
    compile(pattern)
        .map(|re| re.is_match(candidate))
        .unwrap_or(false)
}

/// Translate wildcard syntax into regex syntax.
fn translate(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let n = chars.len();
    let mut out = String::from("(?s)^");
    let mut i = 0;

    while i < n {
        let c = chars[i];
        i += 1;
        match c {
            '*' => {
                while i < n && chars[i] == '*' {
                    i += 1;
                }
                out.push_str(".*");
            }
            '?' => out.push('.'),
            '[' => {
                // Find the closing bracket; a `]` right after `[` or `[!` is literal.
                let mut j = i;
                if j < n && chars[j] == '!' {
                    j += 1;
                }
                if j < n && chars[j] == ']' {
                    j += 1;
                }
                while j < n && chars[j] != ']' {
                    j += 1;
                }
                if j >= n {
                    out.push_str(r"\[");
                    continue;
                }
                let mut class: String = chars[i..j].iter().collect();
                i = j + 1;

                let negated = class.starts_with('!');
                if negated {
                    class.remove(0);
                }
                out.push('[');
                if negated {
                    out.push('^');
                } else if class.starts_with('^') {
                    out.push('\\');
                }
                for ch in class.chars() {
                    // Characters with meaning inside a regex class other than ranges.
                    if matches!(ch, '\\' | '[' | ']' | '&' | '~') {
                        out.push('\\');
                    }
                    out.push(ch);
                }
                out.push(']');
            }
            other => {
                let mut buf = [0u8; 4];
                out.push_str(&regex::escape(other.encode_utf8(&mut buf)));
            }
        }
    }

    out.push('$');
    out
}

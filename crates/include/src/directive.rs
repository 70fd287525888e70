//! Include-block scanning and directive line grammar.
//!
//! Line grammar: `[:modifier:]...protocol: payload`, or a bare payload which
//! means `static`. A line whose prefix cannot be understood is never
//! partially consumed: the whole trimmed line becomes a static path.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use weave_core::Protocol;

/// ```` ```include ```` + optional whitespace + newline, lazily up to the next fence.
static INCLUDE_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```include\s*\n(.*?)```").expect("include block pattern is valid")
});

/// Per-directive flag altering resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modifier {
    /// Feed the resolved output back through the expansion pipeline.
    Expand,
}

impl Modifier {
    pub fn keyword(&self) -> &'static str {
        match self {
            Modifier::Expand => "expand",
        }
    }
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

impl FromStr for Modifier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "expand" => Ok(Modifier::Expand),
            other => Err(format!("unknown modifier '{}'", other)),
        }
    }
}

/// One parsed include-block line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub protocol: Protocol,
    pub modifiers: Vec<Modifier>,
    pub payload: String,
    /// 1-based line in the text the directive was parsed from.
    pub line: usize,
}

impl Directive {
    /// A static directive whose payload is the line exactly as written.
    fn literal(line: &str, line_no: usize) -> Self {
        Self {
            protocol: Protocol::Static,
            modifiers: Vec::new(),
            payload: line.to_string(),
            line: line_no,
        }
    }

    pub fn expands(&self) -> bool {
        self.modifiers.contains(&Modifier::Expand)
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for modifier in &self.modifiers {
            write!(f, ":{}", modifier)?;
        }
        if !self.modifiers.is_empty() {
            f.write_str(":")?;
        }
        write!(f, "{}: {}", self.protocol, self.payload)
    }
}

/// A piece of a template: verbatim text, or one include block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    /// Directives in source order. Blank lines are already dropped.
    Block(Vec<Directive>),
}

/// Parse one non-blank include-block line.
pub fn parse_line(line: &str, line_no: usize) -> Directive {
    let line = line.trim();
    parse_prefixed(line, line_no).unwrap_or_else(|| Directive::literal(line, line_no))
}

/// `None` means "not a well-formed prefixed directive".
fn parse_prefixed(line: &str, line_no: usize) -> Option<Directive> {
    let mut rest = line;
    let mut modifiers = Vec::new();
    while let Some(after) = rest.strip_prefix(':') {
        let (name, tail) = after.split_once(':')?;
        modifiers.push(name.parse::<Modifier>().ok()?);
        rest = tail;
    }

    let (protocol, payload) = match rest.split_once(':') {
        Some((keyword, payload)) => (keyword.trim().parse::<Protocol>().ok()?, payload),
        None => (Protocol::Static, rest),
    };

    let payload = payload.trim();
    if payload.is_empty() {
        return None;
    }

    Some(Directive {
        protocol,
        modifiers,
        payload: payload.to_string(),
        line: line_no,
    })
}

/// Split a template into text and include blocks, in source order.
pub fn parse_template(content: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut last = 0;

    for caps in INCLUDE_BLOCK.captures_iter(content) {
        let (Some(whole), Some(body)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if whole.start() > last {
            segments.push(Segment::Text(content[last..whole.start()].to_string()));
        }

        let first_line = line_number(content, body.start());
        let directives = body
            .as_str()
            .split('\n')
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| parse_line(line, first_line + i))
            .collect();
        segments.push(Segment::Block(directives));
        last = whole.end();
    }

    if last < content.len() {
        segments.push(Segment::Text(content[last..].to_string()));
    }
    segments
}

fn line_number(content: &str, offset: usize) -> usize {
    content[..offset].matches('\n').count() + 1
}

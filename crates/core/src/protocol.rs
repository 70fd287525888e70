//! Include protocols: the closed set of strategies a directive can resolve with.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Resolution strategy named by a directive's protocol keyword.
///
/// The keyword used in templates and policy files is `static`, `cli` or
/// `glob`; see [`Protocol::keyword`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Protocol {
    /// Read a file as text.
    #[serde(rename = "static")]
    Static,
    /// Run an external command and capture its standard output.
    #[serde(rename = "cli")]
    Command,
    /// Expand a pattern and concatenate every matching file.
    #[serde(rename = "glob")]
    Glob,
}

impl Protocol {
    pub const ALL: [Protocol; 3] = [Protocol::Static, Protocol::Command, Protocol::Glob];

    /// Keyword as written in include blocks and policy files.
    pub fn keyword(&self) -> &'static str {
        match self {
            Protocol::Static => "static",
            Protocol::Command => "cli",
            Protocol::Glob => "glob",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Returned when a keyword does not name a known protocol.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown protocol: '{0}'")]
pub struct UnknownProtocol(pub String);

impl FromStr for Protocol {
    type Err = UnknownProtocol;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "static" => Ok(Protocol::Static),
            "cli" => Ok(Protocol::Command),
            "glob" => Ok(Protocol::Glob),
            other => Err(UnknownProtocol(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_round_trip_through_from_str() {
        for protocol in Protocol::ALL {
            assert_eq!(protocol.keyword().parse::<Protocol>().unwrap(), protocol);
        }
    }

    #[test]
    fn command_protocol_uses_cli_keyword() {
        assert_eq!(Protocol::Command.to_string(), "cli");
        assert!("command".parse::<Protocol>().is_err());
    }

    #[test]
    fn keywords_are_case_sensitive() {
        assert_eq!(
            "Static".parse::<Protocol>(),
            Err(UnknownProtocol("Static".to_string()))
        );
    }

    #[test]
    fn serde_uses_keywords() {
        let json = serde_json::to_string(&Protocol::Command).unwrap();
        assert_eq!(json, "\"cli\"");
        let parsed: Protocol = serde_json::from_str("\"glob\"").unwrap();
        assert_eq!(parsed, Protocol::Glob);
    }
}

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

const DEFAULT_MAX_INCLUDE_DEPTH: usize = 10;
const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 30;

/// Read a profiled variable: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_opt<F>(lookup: &F, profile: &str, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = lookup(&prefixed).filter(|s| !s.is_empty()) {
            return Some(v);
        }
    }
    lookup(key).filter(|s| !s.is_empty())
}

fn profiled_parse<F, T>(lookup: &F, profile: &str, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    profiled_opt(lookup, profile, key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

// ── Render config ─────────────────────────────────────────────

/// Limits applied to a single render invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Maximum nesting of `expand`-triggered re-resolution.
    #[serde(default = "default_max_include_depth")]
    pub max_include_depth: usize,

    /// Wall-clock limit for a single `cli:` directive.
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,
}

fn default_max_include_depth() -> usize {
    DEFAULT_MAX_INCLUDE_DEPTH
}

fn default_command_timeout_secs() -> u64 {
    DEFAULT_COMMAND_TIMEOUT_SECS
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            max_include_depth: default_max_include_depth(),
            command_timeout_secs: default_command_timeout_secs(),
        }
    }
}

impl RenderConfig {
    /// Build config from environment variables (call `load_dotenv()` first).
    ///
    /// Profile is read from `WEAVE_PROFILE`. When set (e.g. `CI`), every key is
    /// first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    /// Unparseable values fall back to the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reading from an arbitrary source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let profile = lookup("WEAVE_PROFILE").unwrap_or_default().to_uppercase();
        let p = profile.as_str();
        Self {
            max_include_depth: profiled_parse(
                &lookup,
                p,
                "WEAVE_MAX_INCLUDE_DEPTH",
                DEFAULT_MAX_INCLUDE_DEPTH,
            ),
            command_timeout_secs: profiled_parse(
                &lookup,
                p,
                "WEAVE_COMMAND_TIMEOUT_SECS",
                DEFAULT_COMMAND_TIMEOUT_SECS,
            ),
        }
    }

    pub fn with_max_include_depth(mut self, depth: usize) -> Self {
        self.max_include_depth = depth;
        self
    }

    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout_secs = timeout.as_secs().max(1);
        self
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!(
            max_include_depth = self.max_include_depth,
            command_timeout_secs = self.command_timeout_secs,
            "render config loaded"
        );
    }
}

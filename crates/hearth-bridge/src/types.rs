//! Shared data types for hearth-bridge.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies the tmux pane hosting the REPL (`session`, `session:window`, or
/// `session:window.pane` — anything `tmux`'s `-t` flag accepts).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaneTarget(pub String);

impl PaneTarget {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PaneTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for PaneTarget {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for PaneTarget {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Outcome of an `injectText` call. Per §4.1, the Session Bridge never
/// panics when the target session is gone — it reports the fact instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InjectOutcome {
    Injected,
    SessionAbsent,
}

//! `hearth-bridge` — the Session Bridge: the only module permitted to talk
//! to the multiplexer hosting the REPL.
//!
//! Exposes exactly three operations (`inject_text`, `is_agent_idle`,
//! `capture_pane`) over a tmux pane target, matching §4.1's contract.

pub mod bridge;
pub mod error;
pub mod types;

pub use bridge::{SessionBridge, DEFAULT_IDLE_MARKERS};
pub use error::{BridgeError, Result};
pub use types::{InjectOutcome, PaneTarget};

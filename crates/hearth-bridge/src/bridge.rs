//! `SessionBridge` — the only module permitted to talk to the tmux pane
//! hosting the REPL.
//!
//! The REPL here is externally spawned (by the operator, or by whatever
//! launched the daemon's sidecar) and merely observed: the bridge never owns
//! the process, only a tmux pane target string. This replaces the owned-PTY
//! approach the daemon's predecessor used — there is no `portable-pty`
//! child here, only `tmux` invocations against a pane that may or may not
//! exist at any given moment.

use crate::error::{BridgeError, Result};
use crate::types::{InjectOutcome, PaneTarget};
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

const IDLE_CHECK_TIMEOUT: Duration = Duration::from_secs(1);

/// Default set of patterns that indicate the REPL is waiting on input,
/// checked against the last non-empty line of the pane.
pub const DEFAULT_IDLE_MARKERS: &[&str] = &["> ", "?>", "│ >"];

pub struct SessionBridge {
    target: PaneTarget,
    idle_markers: Vec<String>,
}

impl SessionBridge {
    pub fn new(target: PaneTarget) -> Self {
        Self {
            target,
            idle_markers: DEFAULT_IDLE_MARKERS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn with_idle_markers(mut self, markers: Vec<String>) -> Self {
        self.idle_markers = markers;
        self
    }

    pub fn target(&self) -> &PaneTarget {
        &self.target
    }

    /// Whether the observed pane is currently alive. Public wrapper around
    /// the same `tmux has-session` check `inject_text` uses internally, for
    /// callers (e.g. `/status`) that only need the existence check.
    pub async fn session_exists(&self) -> Result<bool> {
        self.pane_exists().await
    }

    /// List every pane tmux currently knows about, one `session:window.pane`
    /// target per entry. Diagnostic only — the bridge still only ever acts
    /// on its own configured `target`.
    pub async fn list_sessions(&self) -> Result<Vec<String>> {
        let output = self
            .tmux(&["list-panes", "-a", "-F", "#{session_name}:#{window_index}.#{pane_index}"])
            .await;
        match output {
            Ok(raw) => Ok(raw.lines().map(str::to_string).collect()),
            Err(BridgeError::CommandFailed(_)) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    /// Type `text` into the REPL's input and submit it with a newline sent
    /// as a separate keystroke.
    ///
    /// Per §4.1: embedded `\r`/`\n` are collapsed to single spaces before
    /// injection, and the text is sent via `tmux send-keys -l` (literal
    /// mode) so the REPL sees pasted text rather than an interpreted
    /// command. If the target pane is gone, this is a no-op that reports
    /// [`InjectOutcome::SessionAbsent`] rather than erroring.
    pub async fn inject_text(&self, text: &str) -> Result<InjectOutcome> {
        let sanitized = sanitize_for_injection(text);

        if !self.pane_exists().await? {
            warn!(target = %self.target, "inject_text: pane absent, no-op");
            return Ok(InjectOutcome::SessionAbsent);
        }

        self.tmux(&["send-keys", "-t", self.target.as_str(), "-l", &sanitized])
            .await?;
        self.tmux(&["send-keys", "-t", self.target.as_str(), "Enter"])
            .await?;

        debug!(target = %self.target, len = sanitized.len(), "injected text");
        Ok(InjectOutcome::Injected)
    }

    /// Returns true when the REPL appears to be waiting on input rather
    /// than mid-response. Heuristic, advisory only per §9's "busy gate"
    /// design note — never blocks longer than one second.
    pub async fn is_agent_idle(&self) -> Result<bool> {
        let check = async {
            let tail = self.capture_pane(5).await?;
            let last_nonblank = tail.lines().rev().find(|l| !l.trim().is_empty());
            Ok::<bool, BridgeError>(match last_nonblank {
                Some(line) => self
                    .idle_markers
                    .iter()
                    .any(|marker| line.trim_end().ends_with(marker.as_str())),
                None => false,
            })
        };

        match timeout(IDLE_CHECK_TIMEOUT, check).await {
            Ok(result) => result,
            Err(_) => {
                warn!(target = %self.target, "is_agent_idle: screen read exceeded 1s, assuming busy");
                Ok(false)
            }
        }
    }

    /// Returns the bottom `n_lines` of the pane as a single string.
    pub async fn capture_pane(&self, n_lines: u32) -> Result<String> {
        let start = format!("-{n_lines}");
        let output = self
            .tmux(&["capture-pane", "-p", "-t", self.target.as_str(), "-S", &start])
            .await?;
        Ok(output)
    }

    async fn pane_exists(&self) -> Result<bool> {
        let bin = tmux_binary()?;
        let status = Command::new(bin)
            .args(["has-session", "-t", self.target.as_str()])
            .status()
            .await?;
        Ok(status.success())
    }

    async fn tmux(&self, args: &[&str]) -> Result<String> {
        let bin = tmux_binary()?;
        let output = Command::new(bin).args(args).output().await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            if stderr.contains("can't find") || stderr.contains("no such") {
                return Err(BridgeError::TargetNotFound(self.target.to_string()));
            }
            return Err(BridgeError::CommandFailed(stderr));
        }

        let stripped = strip_ansi_escapes::strip(&output.stdout);
        Ok(String::from_utf8_lossy(&stripped).into_owned())
    }
}

fn tmux_binary() -> Result<std::path::PathBuf> {
    which::which("tmux").map_err(|_| BridgeError::TmuxNotFound)
}

/// Collapse embedded carriage returns and newlines to single spaces, and
/// shell-escape single quotes so the literal-mode `send-keys` payload can't
/// be mistaken for shell syntax by anything downstream that re-quotes it.
fn sanitize_for_injection(text: &str) -> String {
    text.replace(['\r', '\n'], " ").replace('\'', "'\\''")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_collapses_newlines() {
        let sanitized = sanitize_for_injection("line one\nline two\r\nline three");
        assert!(!sanitized.contains('\n'));
        assert!(!sanitized.contains('\r'));
        assert_eq!(sanitized, "line one line two  line three");
    }

    #[test]
    fn sanitize_escapes_single_quotes() {
        let sanitized = sanitize_for_injection("it's here");
        assert_eq!(sanitized, "it'\\''s here");
    }

    #[tokio::test]
    async fn session_exists_is_false_for_unused_name() {
        let bridge = SessionBridge::new(PaneTarget::from("hearth-test-absent-9f3c"));
        match bridge.session_exists().await {
            Ok(exists) => assert!(!exists),
            Err(BridgeError::TmuxNotFound) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    #[tokio::test]
    async fn inject_into_absent_session_is_noop() {
        // No tmux session named this will ever exist in a test sandbox.
        let bridge = SessionBridge::new(PaneTarget::from("hearth-test-absent-9f3c"));
        let outcome = bridge.inject_text("hello").await;
        // Either tmux is unavailable (TmuxNotFound) or it's reachable and the
        // pane genuinely doesn't exist (SessionAbsent) — both are acceptable
        // non-panicking outcomes for this environment-dependent check.
        match outcome {
            Ok(InjectOutcome::SessionAbsent) => {}
            Err(BridgeError::TmuxNotFound) => {}
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}

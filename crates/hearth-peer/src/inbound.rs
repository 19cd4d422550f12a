//! Inbound `POST /agent/message` handling (§4.7, §6.1). The HTTP layer
//! itself lives in `hearth-daemon`; this module is the pure validation +
//! formatting logic the handler calls into, so it can be unit tested
//! without standing up an HTTP server.

use dashmap::DashMap;
use hearth_bridge::SessionBridge;
use hearth_core::types::AgentMessageKind;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

/// §7 `AuthFailure` policy: "increment a per-sender counter; if the counter
/// trips a threshold, temporarily refuse that sender." Keyed by source IP
/// since a bad bearer carries no agent identity yet.
const AUTH_FAILURE_THRESHOLD: u32 = 5;
const AUTH_FAILURE_REFUSAL_WINDOW: Duration = Duration::from_secs(300);

struct FailureEntry {
    count: AtomicU32,
    tripped_at: std::sync::Mutex<Option<Instant>>,
}

/// Tracks bad-bearer attempts per source IP and temporarily refuses a
/// source once it trips the threshold.
pub struct AuthFailureTracker {
    entries: DashMap<String, FailureEntry>,
}

impl AuthFailureTracker {
    pub fn new() -> Self {
        Self { entries: DashMap::new() }
    }

    /// Returns true if `source` is currently under a temporary refusal.
    pub fn is_refused(&self, source: &str) -> bool {
        if let Some(entry) = self.entries.get(source) {
            if let Some(tripped_at) = *entry.tripped_at.lock().unwrap() {
                return tripped_at.elapsed() < AUTH_FAILURE_REFUSAL_WINDOW;
            }
        }
        false
    }

    /// Record one bad-bearer attempt from `source`, tripping the refusal
    /// once the threshold is reached.
    pub fn record_failure(&self, source: &str) {
        let entry = self
            .entries
            .entry(source.to_string())
            .or_insert_with(|| FailureEntry {
                count: AtomicU32::new(0),
                tripped_at: std::sync::Mutex::new(None),
            });
        let count = entry.count.fetch_add(1, Ordering::SeqCst) + 1;
        if count >= AUTH_FAILURE_THRESHOLD {
            *entry.tripped_at.lock().unwrap() = Some(Instant::now());
        }
    }

    pub fn clear(&self, source: &str) {
        self.entries.remove(source);
    }
}

impl Default for AuthFailureTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Validates an inbound bearer token against the configured shared secret.
pub fn bearer_matches(header_value: Option<&str>, expected_secret: &str) -> bool {
    match header_value.and_then(|h| h.strip_prefix("Bearer ")) {
        Some(token) => token == expected_secret,
        None => false,
    }
}

/// Format an `AgentMessage`'s text for injection, per §4.7:
/// `"[Agent] Name: ..."`.
pub fn format_for_injection(from: &str, kind: &AgentMessageKind) -> String {
    let body = match kind {
        AgentMessageKind::Text { text } => text.clone(),
        AgentMessageKind::Status { status } => format!("status: {status}"),
        AgentMessageKind::Coordination { action, task } => format!("{action}: {task}"),
        AgentMessageKind::PrReview { repo, branch, pr } => {
            format!("pr-review {repo}@{branch} #{pr}")
        }
    };
    format!("[Agent] {from}: {body}")
}

/// Inject a validated inbound `AgentMessage` into the REPL via the Session
/// Bridge, per §4.7 step "format `\"[Agent] Name: ...\"` and inject".
pub async fn inject(
    bridge: &SessionBridge,
    from: &str,
    kind: &AgentMessageKind,
) -> hearth_bridge::Result<hearth_bridge::InjectOutcome> {
    let text = format_for_injection(from, kind);
    bridge.inject_text(&text).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_token_must_match_exactly() {
        assert!(bearer_matches(Some("Bearer secret123"), "secret123"));
        assert!(!bearer_matches(Some("Bearer wrong"), "secret123"));
        assert!(!bearer_matches(None, "secret123"));
        assert!(!bearer_matches(Some("secret123"), "secret123"));
    }

    #[test]
    fn failure_tracker_trips_after_threshold() {
        let tracker = AuthFailureTracker::new();
        for _ in 0..AUTH_FAILURE_THRESHOLD - 1 {
            tracker.record_failure("10.0.0.5");
        }
        assert!(!tracker.is_refused("10.0.0.5"));
        tracker.record_failure("10.0.0.5");
        assert!(tracker.is_refused("10.0.0.5"));
    }

    #[test]
    fn unrelated_source_is_unaffected() {
        let tracker = AuthFailureTracker::new();
        for _ in 0..10 {
            tracker.record_failure("10.0.0.5");
        }
        assert!(!tracker.is_refused("10.0.0.9"));
    }

    #[test]
    fn format_prefixes_agent_tag() {
        let text = format_for_injection("r2d2", &AgentMessageKind::Text { text: "ping".into() });
        assert_eq!(text, "[Agent] r2d2: ping");
    }
}

//! Replay defense (§4.8, P6): "remember `(from, nonce)` pairs seen in the
//! last 5 minutes; a repeat is rejected as a replay." Entries older than
//! the window are swept on each call rather than on a timer, since relay
//! traffic is low-volume.

use dashmap::DashMap;
use std::time::{Duration, Instant};

const REPLAY_WINDOW: Duration = Duration::from_secs(300);

#[derive(Clone)]
pub struct ReplayGuard {
    seen: std::sync::Arc<DashMap<(String, String), Instant>>,
}

impl ReplayGuard {
    pub fn new() -> Self {
        Self { seen: std::sync::Arc::new(DashMap::new()) }
    }

    /// Returns `true` if `(from, nonce)` has not been observed within the
    /// window, recording it as seen in that case. Returns `false` — replay
    /// — if it has.
    pub fn check_and_record(&self, from: &str, nonce: &str) -> bool {
        self.sweep();
        let key = (from.to_string(), nonce.to_string());
        if self.seen.contains_key(&key) {
            return false;
        }
        self.seen.insert(key, Instant::now());
        true
    }

    fn sweep(&self) {
        self.seen.retain(|_, seen_at| seen_at.elapsed() < REPLAY_WINDOW);
    }
}

impl Default for ReplayGuard {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sighting_is_accepted() {
        let guard = ReplayGuard::new();
        assert!(guard.check_and_record("hearth-alpha", "n1"));
    }

    #[test]
    fn repeat_nonce_from_same_sender_is_rejected() {
        let guard = ReplayGuard::new();
        assert!(guard.check_and_record("hearth-alpha", "n1"));
        assert!(!guard.check_and_record("hearth-alpha", "n1"));
    }

    #[test]
    fn same_nonce_from_different_sender_is_distinct() {
        let guard = ReplayGuard::new();
        assert!(guard.check_and_record("hearth-alpha", "n1"));
        assert!(guard.check_and_record("hearth-beta", "n1"));
    }
}

//! `CaptureCoordinator` — dedup and per-turn state for the four cooperating
//! capture layers described in §4.2.
//!
//! Each layer independently attempts to claim a candidate fingerprint via
//! [`CaptureCoordinator::try_deliver`]. Because all four share one dedup
//! store behind a single mutex, whichever layer observes the response first
//! wins the claim; later layers observing the same (normalized) text find
//! it already claimed and back off silently. This gives the priority
//! ordering in §4.2 for free from each layer's own timing rather than
//! needing an explicit scheduler: hook-driven capture fires at ~0 ms,
//! the retry loop at up to 30 s, the background poll every ~15 s, and
//! pane-capture only after ~60 s of silence.

use crate::fingerprint::fingerprint;
use crate::noise_filter::NoiseFilter;
use crate::types::TranscriptLine;
use hearth_core::types::{AssistantResponse, CaptureLayer, HookEvent};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::Instant;
use tracing::{debug, info};

/// Bounded LRU of recently delivered fingerprints — the `recently-delivered`
/// set from §4.2's state machine.
pub struct CaptureCoordinator {
    recently_delivered: Mutex<LruCache<String, ()>>,
    include_thinking: bool,
    noise_filter: NoiseFilter,
}

impl CaptureCoordinator {
    pub fn new(capacity: usize, include_thinking: bool, noise_filter: NoiseFilter) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(256).unwrap());
        Self {
            recently_delivered: Mutex::new(LruCache::new(capacity)),
            include_thinking,
            noise_filter,
        }
    }

    pub fn include_thinking(&self) -> bool {
        self.include_thinking
    }

    /// Among a run of numbered transcript lines, find the last assistant
    /// line with extractable text. Per §4.2: only the final assistant
    /// message between one user input and the next matters.
    pub fn last_candidate(&self, lines: &[(u64, TranscriptLine)]) -> Option<(u64, String)> {
        lines
            .iter()
            .rev()
            .find_map(|(n, line)| {
                if !line.is_assistant() {
                    return None;
                }
                line.extract_text(self.include_thinking).map(|t| (*n, t))
            })
    }

    /// Clean a raw pane-capture tail of status-line chrome before it's
    /// considered as a candidate. Returns `None` if only chrome remains.
    pub fn clean_pane_tail(&self, raw: &str) -> Option<String> {
        self.noise_filter.clean(raw)
    }

    /// Attempt to claim delivery of `text` as an [`AssistantResponse`].
    ///
    /// Returns `Some` only if this fingerprint has not already been
    /// delivered — the single choke point enforcing P1 (dedup) and P3
    /// (layer priority) across all four capture layers.
    pub fn try_deliver(
        &self,
        text: &str,
        transcript_line_number: u64,
        layer: CaptureLayer,
        injected_at: Instant,
        hook_event: Option<HookEvent>,
    ) -> Option<AssistantResponse> {
        let fp = fingerprint(text);

        let mut guard = self.recently_delivered.lock().unwrap();
        if guard.contains(&fp) {
            debug!(fingerprint = %fp, %layer, "duplicate candidate, already delivered");
            return None;
        }
        guard.put(fp.clone(), ());
        drop(guard);

        let elapsed_ms = injected_at.elapsed().as_millis() as u64;
        info!(fingerprint = %fp, %layer, elapsed_ms, "claimed delivery");

        Some(AssistantResponse {
            text: text.to_string(),
            transcript_line_number,
            capture_layer: layer,
            elapsed_ms,
            hook_event,
            fingerprint: fp,
            captured_at: chrono::Utc::now(),
        })
    }

    pub fn is_already_delivered(&self, text: &str) -> bool {
        let fp = fingerprint(text);
        self.recently_delivered.lock().unwrap().contains(&fp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn line(kind: &str, text: &str) -> TranscriptLine {
        let raw = format!(
            r#"{{"type":"{kind}","message":{{"content":[{{"type":"text","text":"{text}"}}]}}}}"#
        );
        serde_json::from_str(&raw).unwrap()
    }

    #[test]
    fn p1_dedup_same_fingerprint_claims_once() {
        let coord = CaptureCoordinator::new(16, false, NoiseFilter::default_patterns());
        let first = coord.try_deliver("hello", 1, CaptureLayer::Hook, Instant::now(), None);
        let second = coord.try_deliver("hello", 1, CaptureLayer::Retry, Instant::now(), None);
        assert!(first.is_some());
        assert!(second.is_none());
    }

    #[test]
    fn p3_layer_priority_first_claim_wins_regardless_of_which_layer() {
        let coord = CaptureCoordinator::new(16, false, NoiseFilter::default_patterns());
        let hook_claim = coord.try_deliver("hi dave", 3, CaptureLayer::Hook, Instant::now(), None);
        assert!(hook_claim.is_some());
        assert_eq!(hook_claim.unwrap().capture_layer, CaptureLayer::Hook);

        // retry loop observes the same text moments later — must not re-deliver.
        let retry_claim =
            coord.try_deliver("hi dave", 3, CaptureLayer::Retry, Instant::now(), None);
        assert!(retry_claim.is_none());
    }

    #[test]
    fn whitespace_variance_still_dedups() {
        let coord = CaptureCoordinator::new(16, false, NoiseFilter::default_patterns());
        let first = coord.try_deliver("  hi, dave  ", 1, CaptureLayer::Retry, Instant::now(), None);
        let second = coord.try_deliver("hi, dave", 1, CaptureLayer::BackgroundPoll, Instant::now(), None);
        assert!(first.is_some());
        assert!(second.is_none());
    }

    #[test]
    fn last_candidate_picks_final_assistant_line_in_tool_loop() {
        let coord = CaptureCoordinator::new(16, false, NoiseFilter::default_patterns());
        let lines = vec![
            (1, line("user", "do a thing")),
            (2, line("assistant", "intermediate thought")),
            (3, line("assistant", "final answer")),
        ];
        let candidate = coord.last_candidate(&lines);
        assert_eq!(candidate, Some((3, "final answer".to_string())));
    }

    #[test]
    fn last_candidate_ignores_trailing_user_line() {
        let coord = CaptureCoordinator::new(16, false, NoiseFilter::default_patterns());
        let lines = vec![(1, line("assistant", "answer")), (2, line("user", "thanks"))];
        assert_eq!(coord.last_candidate(&lines), Some((1, "answer".to_string())));
    }

    #[test]
    fn last_candidate_none_when_no_assistant_text() {
        let coord = CaptureCoordinator::new(16, false, NoiseFilter::default_patterns());
        let lines = vec![(1, line("user", "hello"))];
        assert_eq!(coord.last_candidate(&lines), None);
    }
}

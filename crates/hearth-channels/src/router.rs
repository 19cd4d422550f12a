//! `ChannelRouter` — delivers one `AssistantResponse` via exactly one
//! outbound adapter, applying rate-limiting and truncation (§4.3).
//!
//! Per §9's mediator design note: the router holds typed references to
//! adapters (through [`ChannelManager`]); no adapter holds a reference back
//! to the router, avoiding the mutual-recursion pitfall of the logical ring
//! (inbound adapter → router → outbound adapter).

use crate::error::{ChannelError, Result};
use crate::manager::ChannelManager;
use crate::state::ChannelStateStore;
use crate::types::{truncate_for_channel, MessageFormat, OutboundMessage};
use hearth_core::types::{AssistantResponse, CaptureLayer, ChannelState, DeliveryEvent, DeliveryRecord};
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{info, warn};

const DEFAULT_MAX_OUTBOUND_CHARS: usize = 4_000;
/// Small cap on how many excess messages per recipient are held before being
/// dropped, per §4.3's "queued up to a small cap and then dropped".
const RATE_LIMIT_QUEUE_CAP: u32 = 3;

struct TokenBucket {
    capacity: u32,
    tokens: u32,
    window: Duration,
    last_refill: Instant,
}

impl TokenBucket {
    fn new(capacity: u32, window: Duration) -> Self {
        Self {
            capacity,
            tokens: capacity,
            window,
            last_refill: Instant::now(),
        }
    }

    /// Returns true if a send should proceed, false if it should be queued
    /// (and eventually dropped once the queue cap is exceeded).
    fn try_consume(&mut self) -> bool {
        if self.last_refill.elapsed() >= self.window {
            self.tokens = self.capacity;
            self.last_refill = Instant::now();
        }
        if self.tokens > 0 {
            self.tokens -= 1;
            true
        } else {
            false
        }
    }
}

pub struct ChannelRouter {
    manager: ChannelManager,
    state: ChannelStateStore,
    buckets: Mutex<HashMap<String, TokenBucket>>,
    /// Messages held while a recipient's token bucket is exhausted, per
    /// §4.3's "queued up to a small cap and then dropped". Bounded at
    /// `RATE_LIMIT_QUEUE_CAP`; the oldest is evicted once a recipient's
    /// queue is full.
    queued_overflow: Mutex<HashMap<String, VecDeque<OutboundMessage>>>,
    last_chat_recipient: Mutex<Option<(String, String)>>,
    delivery_log_path: PathBuf,
    rate_limit_per_window: u32,
    rate_limit_window: Duration,
    max_outbound_chars: usize,
}

impl ChannelRouter {
    pub fn new(
        manager: ChannelManager,
        state: ChannelStateStore,
        delivery_log_path: PathBuf,
        rate_limit_per_window: u32,
    ) -> Self {
        Self {
            manager,
            state,
            buckets: Mutex::new(HashMap::new()),
            queued_overflow: Mutex::new(HashMap::new()),
            last_chat_recipient: Mutex::new(None),
            delivery_log_path,
            rate_limit_per_window,
            rate_limit_window: Duration::from_secs(60),
            max_outbound_chars: DEFAULT_MAX_OUTBOUND_CHARS,
        }
    }

    pub fn state(&self) -> &ChannelStateStore {
        &self.state
    }

    /// Record a `retry-exhausted` `DeliveryRecord` for a turn where all four
    /// Transcript Stream capture layers failed within their horizon (§4.2,
    /// §7 `CaptureExhausted`: "log `retry-exhausted`; no outbound
    /// delivery"). There is no captured response to carry a layer or
    /// fingerprint, so both are left empty.
    pub fn log_retry_exhausted(&self, elapsed_ms: u64) -> Result<()> {
        let record = DeliveryRecord {
            event: DeliveryEvent::RetryExhausted,
            layer: None,
            recipient: None,
            fingerprint: String::new(),
            elapsed_ms,
            retry_attempt: 0,
            recorded_at: chrono::Utc::now(),
        };
        hearth_core::state::append_jsonl(&self.delivery_log_path, &record)
            .map_err(|e| ChannelError::ConfigError(e.to_string()))
    }

    /// Record the most recent inbound chat sender so a subsequent `route`
    /// while `ChannelState == chat` has somewhere to deliver to.
    pub fn note_chat_recipient(&self, channel: &str, recipient_id: &str) {
        *self.last_chat_recipient.lock().unwrap() =
            Some((channel.to_string(), recipient_id.to_string()));
    }

    /// Dispatch a finalized [`AssistantResponse`] to the active channel.
    /// Always records a `DeliveryRecord` carrying the response's capture
    /// layer and fingerprint, even when the state is `silent` (delivered to
    /// the null sink) per §9 scenario S5.
    pub async fn route(&self, resp: &AssistantResponse) -> Result<()> {
        let started = Instant::now();
        let layer = Some(resp.capture_layer);
        match self.state.get() {
            ChannelState::Silent => {
                info!("channel state is silent, suppressing outbound delivery");
                self.log_delivery(None, layer, &resp.fingerprint, started)?;
                Ok(())
            }
            ChannelState::Terminal => {
                // Already visible on the REPL pane; nothing to forward.
                self.log_delivery(None, layer, &resp.fingerprint, started)?;
                Ok(())
            }
            ChannelState::Chat => {
                let recipient = self.last_chat_recipient.lock().unwrap().clone();
                match recipient {
                    Some((channel, recipient_id)) => {
                        self.send_with_limits(&channel, &recipient_id, &resp.text).await?;
                        self.log_delivery(Some(recipient_id), layer, &resp.fingerprint, started)?;
                        Ok(())
                    }
                    None => {
                        warn!("no known chat recipient, holding response for next inbound message");
                        Ok(())
                    }
                }
            }
            ChannelState::VoicePending => {
                warn!("voice channel is pending, response held");
                Ok(())
            }
        }
    }

    /// Used by scheduled tasks to push text to the user without a
    /// triggering prompt.
    pub async fn route_outgoing_proactive(
        &self,
        text: &str,
        channel: &str,
        recipient: Option<&str>,
    ) -> Result<()> {
        let started = Instant::now();
        let recipient_id = match recipient.map(str::to_string).or_else(|| {
            self.last_chat_recipient
                .lock()
                .unwrap()
                .as_ref()
                .filter(|(c, _)| c == channel)
                .map(|(_, r)| r.clone())
        }) {
            Some(r) => r,
            None => return Err(ChannelError::NoRecipient),
        };

        self.send_with_limits(channel, &recipient_id, text).await?;
        self.log_delivery(Some(recipient_id), None, "", started)?;
        Ok(())
    }

    async fn send_with_limits(&self, channel: &str, recipient_id: &str, text: &str) -> Result<()> {
        // Give anything already queued for this recipient first crack at the
        // bucket's tokens, so delivery stays FIFO instead of letting newer
        // messages cut ahead of held ones.
        self.flush_queue(recipient_id).await?;

        let truncated = truncate_for_channel(text, self.max_outbound_chars);
        let message = OutboundMessage {
            channel: channel.to_string(),
            recipient_id: recipient_id.to_string(),
            content: truncated,
            format: MessageFormat::PlainText,
        };

        if self.try_consume_token(recipient_id) {
            return self.dispatch(&message).await;
        }

        self.enqueue_or_drop(recipient_id, message);
        Ok(())
    }

    fn try_consume_token(&self, recipient_id: &str) -> bool {
        let mut buckets = self.buckets.lock().unwrap();
        let bucket = buckets
            .entry(recipient_id.to_string())
            .or_insert_with(|| TokenBucket::new(self.rate_limit_per_window, self.rate_limit_window));
        bucket.try_consume()
    }

    /// Hold `message` in the recipient's bounded queue, evicting the oldest
    /// queued message once `RATE_LIMIT_QUEUE_CAP` is exceeded (§4.3).
    fn enqueue_or_drop(&self, recipient_id: &str, message: OutboundMessage) {
        let mut overflow = self.queued_overflow.lock().unwrap();
        let queue = overflow.entry(recipient_id.to_string()).or_default();
        if queue.len() >= RATE_LIMIT_QUEUE_CAP as usize {
            warn!(recipient = %recipient_id, "rate-limit queue full, dropping oldest queued message");
            queue.pop_front();
        }
        warn!(recipient = %recipient_id, queued = queue.len() + 1, "rate limit exceeded, message queued");
        queue.push_back(message);
    }

    /// Drain as much of the recipient's held queue as the token bucket
    /// currently allows, oldest first.
    async fn flush_queue(&self, recipient_id: &str) -> Result<()> {
        loop {
            let has_queued = {
                let overflow = self.queued_overflow.lock().unwrap();
                overflow.get(recipient_id).map(|q| !q.is_empty()).unwrap_or(false)
            };
            if !has_queued || !self.try_consume_token(recipient_id) {
                break;
            }
            let next = {
                let mut overflow = self.queued_overflow.lock().unwrap();
                overflow.get_mut(recipient_id).and_then(VecDeque::pop_front)
            };
            if let Some(message) = next {
                self.dispatch(&message).await?;
            }
        }
        Ok(())
    }

    async fn dispatch(&self, message: &OutboundMessage) -> Result<()> {
        let adapter = self
            .manager
            .get(&message.channel)
            .ok_or_else(|| ChannelError::NoAdapter(message.channel.clone()))?;
        adapter.send(message).await
    }

    fn log_delivery(
        &self,
        recipient: Option<String>,
        layer: Option<CaptureLayer>,
        fingerprint: &str,
        started: Instant,
    ) -> Result<()> {
        let record = DeliveryRecord {
            event: DeliveryEvent::Delivered,
            layer,
            recipient,
            fingerprint: fingerprint.to_string(),
            elapsed_ms: started.elapsed().as_millis() as u64,
            retry_attempt: 0,
            recorded_at: chrono::Utc::now(),
        };
        hearth_core::state::append_jsonl(&self.delivery_log_path, &record)
            .map_err(|e| ChannelError::ConfigError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_response(text: &str) -> AssistantResponse {
        AssistantResponse {
            text: text.to_string(),
            transcript_line_number: 1,
            capture_layer: CaptureLayer::Retry,
            elapsed_ms: 10_000,
            hook_event: None,
            fingerprint: "deadbeef".to_string(),
            captured_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn silent_state_suppresses_but_still_logs() {
        let dir = tempfile::tempdir().unwrap();
        let state = ChannelStateStore::load(dir.path().join("channel.txt"));
        state.set(ChannelState::Silent).unwrap();

        let router = ChannelRouter::new(
            ChannelManager::new(),
            state,
            dir.path().join("delivery.jsonl"),
            10,
        );

        router.route(&sample_response("hello")).await.unwrap();
        let log = std::fs::read_to_string(dir.path().join("delivery.jsonl")).unwrap();
        assert_eq!(log.lines().count(), 1);
        assert!(log.contains("\"retry\""));
        assert!(log.contains("deadbeef"));
    }

    #[tokio::test]
    async fn chat_state_without_known_recipient_holds_response() {
        let dir = tempfile::tempdir().unwrap();
        let state = ChannelStateStore::load(dir.path().join("channel.txt"));
        state.set(ChannelState::Chat).unwrap();

        let router = ChannelRouter::new(
            ChannelManager::new(),
            state,
            dir.path().join("delivery.jsonl"),
            10,
        );

        router.route(&sample_response("hello")).await.unwrap();
        assert!(!dir.path().join("delivery.jsonl").exists());
    }

    #[test]
    fn token_bucket_denies_after_capacity_exhausted() {
        let mut bucket = TokenBucket::new(2, Duration::from_secs(60));
        assert!(bucket.try_consume());
        assert!(bucket.try_consume());
        assert!(!bucket.try_consume());
    }

    struct RecordingChannel {
        sent: std::sync::Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl crate::channel::Channel for RecordingChannel {
        fn name(&self) -> &str {
            "test"
        }
        async fn connect(&mut self) -> std::result::Result<(), ChannelError> {
            Ok(())
        }
        async fn disconnect(&mut self) -> std::result::Result<(), ChannelError> {
            Ok(())
        }
        async fn send(&self, msg: &OutboundMessage) -> std::result::Result<(), ChannelError> {
            self.sent.lock().unwrap().push(msg.content.clone());
            Ok(())
        }
        fn status(&self) -> crate::types::ChannelStatus {
            crate::types::ChannelStatus::Connected
        }
    }

    #[tokio::test]
    async fn excess_sends_are_queued_then_dropped_once_cap_exceeded() {
        let dir = tempfile::tempdir().unwrap();
        let state = ChannelStateStore::load(dir.path().join("channel.txt"));
        state.set(ChannelState::Chat).unwrap();

        let mut manager = ChannelManager::new();
        manager.register(Box::new(RecordingChannel { sent: std::sync::Mutex::new(Vec::new()) }));

        // Capacity 1/window: the first send consumes the only token, every
        // subsequent one this tick is held in the overflow queue.
        let router = ChannelRouter::new(manager, state, dir.path().join("delivery.jsonl"), 1);
        router.note_chat_recipient("test", "alice");

        for i in 0..(RATE_LIMIT_QUEUE_CAP + 2) {
            router.route(&sample_response(&format!("msg {i}"))).await.unwrap();
        }

        let overflow = router.queued_overflow.lock().unwrap();
        let queue = overflow.get("alice").expect("alice should have a held queue");
        // Capped at RATE_LIMIT_QUEUE_CAP: the oldest held messages were
        // evicted as later ones arrived, per §4.3.
        assert_eq!(queue.len(), RATE_LIMIT_QUEUE_CAP as usize);
    }
}

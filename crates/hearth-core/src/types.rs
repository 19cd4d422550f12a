use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Logical outbound destination category.
///
/// Mirrors `spec.md`'s `Channel` glossary entry: a channel is a category,
/// not a specific recipient — `ChatMessenger` covers every configured chat
/// provider, `Peer` covers both the LAN and relay transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Terminal,
    ChatMessenger,
    Email,
    Voice,
    Peer,
    Silent,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Channel::Terminal => "terminal",
            Channel::ChatMessenger => "chat",
            Channel::Email => "email",
            Channel::Voice => "voice",
            Channel::Peer => "peer",
            Channel::Silent => "silent",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "terminal" => Ok(Channel::Terminal),
            "chat" => Ok(Channel::ChatMessenger),
            "email" => Ok(Channel::Email),
            "voice" => Ok(Channel::Voice),
            "peer" => Ok(Channel::Peer),
            "silent" => Ok(Channel::Silent),
            other => Err(format!("unknown channel: {other}")),
        }
    }
}

/// Process-wide lifecycle state of the active channel.
///
/// A single-writer, multi-reader atom — see `hearth-channels::state` for the
/// atomic-write wrapper. Persisted as the one-word `channel.txt` file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelState {
    Terminal,
    Chat,
    Silent,
    VoicePending,
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChannelState::Terminal => "terminal",
            ChannelState::Chat => "chat",
            ChannelState::Silent => "silent",
            ChannelState::VoicePending => "voice-pending",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for ChannelState {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "terminal" => Ok(ChannelState::Terminal),
            "chat" => Ok(ChannelState::Chat),
            "silent" => Ok(ChannelState::Silent),
            "voice-pending" => Ok(ChannelState::VoicePending),
            other => Err(format!("unknown channel state: {other}")),
        }
    }
}

impl Default for ChannelState {
    fn default() -> Self {
        ChannelState::Terminal
    }
}

/// Which of the four Transcript Stream capture strategies produced a
/// candidate `AssistantResponse`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureLayer {
    Hook,
    Retry,
    BackgroundPoll,
    PaneCapture,
}

impl fmt::Display for CaptureLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CaptureLayer::Hook => "hook",
            CaptureLayer::Retry => "retry",
            CaptureLayer::BackgroundPoll => "backgroundPoll",
            CaptureLayer::PaneCapture => "paneCapture",
        };
        write!(f, "{s}")
    }
}

/// The host-provided lifecycle notification that drove a hook-layer capture.
///
/// Wire values are the spec's literal event names (§4.2: "`Stop |
/// SubagentStop | PostToolUse | UserPromptSubmit`"), not a re-cased idiom —
/// hosts POST these exact strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum HookEvent {
    Stop,
    SubagentStop,
    PostToolUse,
    UserPromptSubmit,
}

/// A finalized text utterance from the REPL, destined for a channel.
///
/// See `spec.md` §3 `AssistantResponse`. `fingerprint` is the dedup key
/// across all four capture layers; `text` is guaranteed non-empty after
/// trimming by the time this struct is constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantResponse {
    pub text: String,
    pub transcript_line_number: u64,
    pub capture_layer: CaptureLayer,
    pub elapsed_ms: u64,
    pub hook_event: Option<HookEvent>,
    pub fingerprint: String,
    pub captured_at: chrono::DateTime<chrono::Utc>,
}

/// One record per successful or exhausted delivery attempt. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryEvent {
    Delivered,
    RetryExhausted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub event: DeliveryEvent,
    pub layer: Option<CaptureLayer>,
    pub recipient: Option<String>,
    pub fingerprint: String,
    pub elapsed_ms: u64,
    pub retry_attempt: u32,
    pub recorded_at: chrono::DateTime<chrono::Utc>,
}

/// Opaque identifier minted for any daemon-internal entity (delivery
/// records, agent messages, relay envelopes) that needs a stable handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The inter-agent message envelope (§3 `AgentMessage`), shared by both the
/// LAN peer path (`hearth-peer`) and the relay path (`hearth-network`) so
/// `sendToPeer`'s routing fallback (§4.8) can hand the same value to either
/// transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentMessage {
    pub from: String,
    #[serde(flatten)]
    pub kind: AgentMessageKind,
    pub message_id: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Type-specific fields for an [`AgentMessage`], tagged on `type` per §3.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentMessageKind {
    Text {
        text: String,
    },
    Status {
        status: String,
    },
    Coordination {
        action: String,
        task: String,
    },
    PrReview {
        repo: String,
        branch: String,
        pr: String,
    },
}

impl AgentMessage {
    pub fn new(from: impl Into<String>, kind: AgentMessageKind) -> Self {
        Self {
            from: from.into(),
            kind,
            message_id: Uuid::new_v4().to_string(),
            timestamp: chrono::Utc::now(),
        }
    }

    /// The dedup key checked at every recipient (§3 invariant): identical
    /// `(from, messageId)` pairs collapse to a single delivery.
    pub fn dedup_key(&self) -> (String, String) {
        (self.from.clone(), self.message_id.clone())
    }
}

#[cfg(test)]
mod agent_message_tests {
    use super::*;

    #[test]
    fn text_message_round_trips_through_json() {
        let msg = AgentMessage::new("r2d2", AgentMessageKind::Text { text: "hi".into() });
        let json = serde_json::to_string(&msg).unwrap();
        let back: AgentMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back.from, "r2d2");
        assert_eq!(back.message_id, msg.message_id);
    }

    #[test]
    fn dedup_key_is_from_and_message_id() {
        let msg = AgentMessage::new("r2d2", AgentMessageKind::Status { status: "idle".into() });
        assert_eq!(msg.dedup_key(), (msg.from.clone(), msg.message_id.clone()));
    }
}

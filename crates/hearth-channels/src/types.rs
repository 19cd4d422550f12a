use serde::{Deserialize, Serialize};

/// A message received from an external channel (a chat messenger provider,
/// email, voice, …).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    pub channel: String,
    pub sender_id: String,
    pub sender_name: Option<String>,
    pub content: String,
    pub timestamp: String,
    pub raw_payload: Option<serde_json::Value>,
}

/// A message to be delivered to an external channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub channel: String,
    pub recipient_id: String,
    pub content: String,
    pub format: MessageFormat,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageFormat {
    #[default]
    PlainText,
    Markdown,
    Html,
}

/// Runtime connection state of a channel adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelStatus {
    Connected,
    Connecting,
    Disconnected,
    Error(String),
}

/// The marker appended to a truncated outbound message, per §4.3.
pub const TRUNCATION_MARKER: &str = " … [truncated]";

/// Truncate `text` to `max_chars`, appending [`TRUNCATION_MARKER`] when it
/// doesn't fit. Character-aware so multi-byte sequences are never split.
pub fn truncate_for_channel(text: &str, max_chars: usize) -> String {
    let char_count = text.chars().count();
    if char_count <= max_chars {
        return text.to_string();
    }
    let budget = max_chars.saturating_sub(TRUNCATION_MARKER.chars().count());
    let head: String = text.chars().take(budget).collect();
    format!("{head}{TRUNCATION_MARKER}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_unchanged() {
        assert_eq!(truncate_for_channel("hi", 100), "hi");
    }

    #[test]
    fn long_text_gets_visible_ellipsis() {
        let text = "a".repeat(200);
        let truncated = truncate_for_channel(&text, 50);
        assert!(truncated.ends_with(TRUNCATION_MARKER));
        assert!(truncated.chars().count() <= 50);
    }
}

//! Transcript line model.
//!
//! Per §9's "Dynamic content unions" design note: `content` is a
//! heterogeneous list. Modeled as a tagged sum whose decoder silently
//! ignores variants it doesn't recognize, so the REPL's transcript format
//! can evolve without breaking the tailer.

use serde::{Deserialize, Serialize};

/// One line of the append-only transcript JSONL file.
#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptLine {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub message: Option<MessageBody>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageBody {
    #[serde(default)]
    pub content: Vec<ContentPart>,
}

/// A single content block within a message. Unrecognized `type` values
/// deserialize to [`ContentPart::Unknown`] rather than failing the whole
/// line, so forward-compatible fields from a newer REPL version don't break
/// parsing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    Thinking { thinking: String },
    ToolUse {
        #[serde(flatten)]
        rest: serde_json::Value,
    },
    ToolResult {
        #[serde(flatten)]
        rest: serde_json::Value,
    },
    #[serde(other)]
    Unknown,
}

impl TranscriptLine {
    /// Whether this line is an assistant turn at all (regardless of whether
    /// it carries usable text).
    pub fn is_assistant(&self) -> bool {
        self.kind == "assistant"
    }

    /// Concatenate this line's text (and, if `include_thinking`, thinking)
    /// parts in order with a single newline separator. Returns `None` when
    /// there are no non-empty text parts — per §4.2's parsing rule, a line
    /// with only tool_use/tool_result/thinking contributes no candidate.
    pub fn extract_text(&self, include_thinking: bool) -> Option<String> {
        let content = &self.message.as_ref()?.content;

        let parts: Vec<&str> = content
            .iter()
            .filter_map(|part| match part {
                ContentPart::Text { text } => {
                    let trimmed = text.trim();
                    (!trimmed.is_empty()).then_some(trimmed)
                }
                ContentPart::Thinking { thinking } if include_thinking => {
                    let trimmed = thinking.trim();
                    (!trimmed.is_empty()).then_some(trimmed)
                }
                _ => None,
            })
            .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_assistant_line_with_text() {
        let raw = r#"{"type":"assistant","message":{"content":[{"type":"text","text":"hi there"}]}}"#;
        let line: TranscriptLine = serde_json::from_str(raw).unwrap();
        assert!(line.is_assistant());
        assert_eq!(line.extract_text(false), Some("hi there".to_string()));
    }

    #[test]
    fn tool_use_only_line_yields_no_text() {
        let raw = r#"{"type":"assistant","message":{"content":[{"type":"tool_use","name":"bash","input":{}}]}}"#;
        let line: TranscriptLine = serde_json::from_str(raw).unwrap();
        assert_eq!(line.extract_text(false), None);
    }

    #[test]
    fn thinking_excluded_unless_verbose() {
        let raw = r#"{"type":"assistant","message":{"content":[{"type":"thinking","thinking":"pondering"},{"type":"text","text":"answer"}]}}"#;
        let line: TranscriptLine = serde_json::from_str(raw).unwrap();
        assert_eq!(line.extract_text(false), Some("answer".to_string()));
        assert_eq!(
            line.extract_text(true),
            Some("pondering\nanswer".to_string())
        );
    }

    #[test]
    fn multiple_text_parts_join_with_newline() {
        let raw = r#"{"type":"assistant","message":{"content":[{"type":"text","text":"first"},{"type":"text","text":"second"}]}}"#;
        let line: TranscriptLine = serde_json::from_str(raw).unwrap();
        assert_eq!(line.extract_text(false), Some("first\nsecond".to_string()));
    }

    #[test]
    fn unknown_content_type_is_ignored_not_fatal() {
        let raw = r#"{"type":"assistant","message":{"content":[{"type":"some_future_kind","blob":42},{"type":"text","text":"still here"}]}}"#;
        let line: TranscriptLine = serde_json::from_str(raw).unwrap();
        assert_eq!(line.extract_text(false), Some("still here".to_string()));
    }

    #[test]
    fn user_line_is_not_assistant() {
        let raw = r#"{"type":"user","message":{"content":[{"type":"text","text":"hello"}]}}"#;
        let line: TranscriptLine = serde_json::from_str(raw).unwrap();
        assert!(!line.is_assistant());
    }
}

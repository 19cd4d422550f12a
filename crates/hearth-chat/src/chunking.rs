//! Code-fence-aware message splitting and markdown escaping, parameterized
//! by a caller-supplied `max_chars` so any provider's own message-length
//! cap can be plugged in.

/// Split `text` into chunks no longer than `max_chars`, never splitting a
/// line when avoidable and keeping fenced code blocks balanced across a
/// chunk boundary by closing the fence before the split and reopening it
/// (with the same language tag) at the start of the next chunk.
pub fn split_chunks_smart(text: &str, max_chars: usize) -> Vec<String> {
    if text.len() <= max_chars {
        return vec![text.to_string()];
    }

    let lines: Vec<&str> = text.split('\n').collect();
    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut fence_lang: Option<String> = None;

    for line in &lines {
        let cost = if current.is_empty() { line.len() } else { 1 + line.len() };

        if !current.is_empty() && current.len() + cost > max_chars {
            if fence_lang.is_some() {
                current.push_str("\n```");
            }
            chunks.push(current);
            current = String::new();
            if let Some(ref lang) = fence_lang {
                if lang.is_empty() {
                    current.push_str("```\n");
                } else {
                    current.push_str("```");
                    current.push_str(lang);
                    current.push('\n');
                }
            }
        }

        if !current.is_empty() {
            current.push('\n');
        }
        current.push_str(line);

        let trimmed = line.trim_start();
        if let Some(after_fence) = trimmed.strip_prefix("```") {
            if fence_lang.is_some() {
                fence_lang = None;
            } else {
                fence_lang = Some(after_fence.trim().to_string());
            }
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    let mut result = Vec::new();
    for chunk in chunks {
        if chunk.len() <= max_chars {
            result.push(chunk);
        } else {
            let mut remaining = chunk.as_str();
            while remaining.len() > max_chars {
                let split_at = remaining[..max_chars]
                    .rfind('\n')
                    .or_else(|| remaining[..max_chars].rfind(' '))
                    .unwrap_or(max_chars);
                result.push(remaining[..split_at].to_string());
                remaining = remaining[split_at..].trim_start();
            }
            if !remaining.is_empty() {
                result.push(remaining.to_string());
            }
        }
    }

    result
}

/// Escape special characters for Telegram-style MarkdownV2, the lowest
/// common denominator markdown flavor across bot-token messengers.
pub fn escape_markdown_v2(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    for ch in text.chars() {
        match ch {
            '_' | '*' | '[' | ']' | '(' | ')' | '~' | '`' | '#' | '+' | '-' | '=' | '|' | '{'
            | '}' | '.' | '!' => {
                out.push('\\');
                out.push(ch);
            }
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: usize = 4090;

    #[test]
    fn short_text_is_single_chunk() {
        let chunks = split_chunks_smart("Hello, world!", MAX);
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn over_limit_splits_on_newline() {
        let line = "a".repeat(2000);
        let text = format!("{line}\n{line}\n{line}");
        let chunks = split_chunks_smart(&text, MAX);
        assert!(chunks.len() >= 2);
        for c in &chunks {
            assert!(c.len() <= MAX);
        }
    }

    #[test]
    fn very_long_single_line_force_splits() {
        let text = "x".repeat(9000);
        let chunks = split_chunks_smart(&text, MAX);
        assert!(chunks.len() >= 2);
    }

    #[test]
    fn code_fence_language_preserved() {
        let mut text = String::from("```python\n");
        for _ in 0..100 {
            text.push_str("print('hello world this is a reasonably long line of python code')\n");
        }
        text.push_str("```\n");

        let chunks = split_chunks_smart(&text, MAX);
        assert!(chunks.len() >= 2);
        assert!(chunks[1].starts_with("```python"));
    }

    #[test]
    fn escape_markdown_v2_escapes_specials() {
        let escaped = escape_markdown_v2("Hello. World! (test) [link]");
        assert!(escaped.contains("\\."));
        assert!(escaped.contains("\\!"));
        assert!(escaped.contains("\\("));
        assert!(escaped.contains("\\["));
    }
}

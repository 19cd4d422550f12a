//! Outbound send: smart-chunk, try markdown, fall back to plain text.

use crate::chunking::{escape_markdown_v2, split_chunks_smart};
use crate::transport::ChatTransport;
use std::time::Duration;
use tracing::warn;

/// Send `text` to `recipient` in smart-chunked messages no longer than
/// `max_chars`. Tries markdown first; if the provider rejects it, falls
/// back to a plain-text send for that chunk. A 100ms delay separates
/// consecutive chunks to stay under typical per-second rate limits.
pub async fn send_response(transport: &dyn ChatTransport, recipient: &str, text: &str, max_chars: usize) {
    let chunks = split_chunks_smart(text, max_chars);
    for (i, chunk) in chunks.iter().enumerate() {
        let escaped = escape_markdown_v2(chunk);
        if let Err(e) = transport.send_markdown(recipient, &escaped).await {
            warn!(error = %e, chunk_index = i, "markdown send rejected, falling back to plain text");
            if let Err(e) = transport.send_plain(recipient, chunk).await {
                warn!(error = %e, chunk_index = i, "plain-text fallback also failed");
            }
        }

        if i + 1 < chunks.len() {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}

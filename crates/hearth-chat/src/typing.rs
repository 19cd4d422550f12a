//! One-shot typing indicator (spec.md 4.4: "no recurring loop — keeps
//! channel-protocol simple").

use crate::transport::ChatTransport;
use tracing::debug;

pub async fn send_typing_once(transport: &dyn ChatTransport, recipient: &str) {
    if let Err(e) = transport.send_typing(recipient).await {
        debug!(error = %e, "typing indicator send failed, ignoring");
    }
}

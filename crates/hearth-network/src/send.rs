//! Outbound relay send (§4.8, §6.2): sign the message's canonical JSON and
//! `POST {relay_url}/relay/send` with `X-Agent`/`X-Signature` headers,
//! posting the exact signed bytes as the body.

use crate::error::{NetworkError, Result};
use crate::identity::AgentIdentity;
use crate::signing::sign_message;
use crate::types::RelayMessage;
use hearth_core::types::AgentMessageKind;
use uuid::Uuid;

pub async fn send(
    client: &reqwest::Client,
    relay_url: &str,
    identity: &AgentIdentity,
    from: &str,
    to: &str,
    kind: AgentMessageKind,
) -> Result<()> {
    let message = RelayMessage {
        from: from.to_string(),
        to: to.to_string(),
        kind,
        timestamp: chrono::Utc::now(),
        message_id: Uuid::new_v4().to_string(),
        nonce: Uuid::new_v4().to_string(),
    };
    let (body, signature) = sign_message(identity, &message)?;

    let url = format!("{}/relay/send", relay_url.trim_end_matches('/'));
    let resp = client
        .post(&url)
        .header("X-Agent", from)
        .header("X-Signature", signature)
        .header("Content-Type", "application/json")
        .body(body)
        .send()
        .await
        .map_err(|e| NetworkError::Transport(e.to_string()))?;

    if resp.status().is_success() {
        Ok(())
    } else {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        Err(NetworkError::RelayRejected { status, body })
    }
}

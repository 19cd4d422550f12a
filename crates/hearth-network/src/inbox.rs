//! Relay inbox poll (§4.8 step "Inbound poll", §6.2): the `relay-inbox-poll`
//! scheduled task body. Fetch, verify against the directory, inject via the
//! Session Bridge, then ack whatever was handled.

use crate::directory::PublicKeyDirectory;
use crate::error::{NetworkError, Result};
use crate::identity::AgentIdentity;
use crate::nonce::ReplayGuard;
use crate::signing::{sign_string, verify_payload};
use crate::types::RelayInboxEntry;
use hearth_bridge::SessionBridge;
use hearth_core::types::AgentMessageKind;
use tracing::warn;

/// Outcome of handling one inbox entry, returned for logging/testing.
#[derive(Debug, PartialEq, Eq)]
pub enum EntryOutcome {
    InjectedVerified,
    InjectedUnverified,
    RejectedReplay,
}

/// Format an entry's text for injection, per §4.8 step 4: `"[Network]
/// Name: text"` for verified entries, with an `[UNVERIFIED]` marker
/// otherwise.
pub fn format_for_injection(from: &str, kind: &AgentMessageKind, verified: bool) -> String {
    let body = match kind {
        AgentMessageKind::Text { text } => text.clone(),
        AgentMessageKind::Status { status } => format!("status: {status}"),
        AgentMessageKind::Coordination { action, task } => format!("{action}: {task}"),
        AgentMessageKind::PrReview { repo, branch, pr } => {
            format!("pr-review {repo}@{branch} #{pr}")
        }
    };
    if verified {
        format!("[Network] {from}: {body}")
    } else {
        format!("[Network] [UNVERIFIED] {from}: {body}")
    }
}

/// Fetch, verify, inject, and ack one poll cycle for `agent_name`.
///
/// Returns the `messageId`s that were successfully handled (injected or
/// rejected-as-replay — either way the relay should stop redelivering
/// them) so the caller can log the cycle.
pub async fn poll_once(
    client: &reqwest::Client,
    relay_url: &str,
    identity: &AgentIdentity,
    agent_name: &str,
    directory: &PublicKeyDirectory,
    replay_guard: &ReplayGuard,
    bridge: &SessionBridge,
) -> Result<Vec<String>> {
    let timestamp = chrono::Utc::now().to_rfc3339();
    let signing_string = format!("GET /inbox/{agent_name} {timestamp}");
    let signature = sign_string(identity, &signing_string);

    let url = format!("{}/relay/inbox/{}", relay_url.trim_end_matches('/'), agent_name);
    let resp = client
        .get(&url)
        .header("X-Agent", agent_name)
        .header("X-Signature", &signature)
        .header("X-Timestamp", &timestamp)
        .send()
        .await
        .map_err(|e| NetworkError::Transport(e.to_string()))?;

    if !resp.status().is_success() {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        return Err(NetworkError::RelayRejected { status, body });
    }

    let entries: Vec<RelayInboxEntry> = resp.json().await.map_err(|e| NetworkError::Transport(e.to_string()))?;
    let mut handled = Vec::with_capacity(entries.len());

    for entry in entries {
        if !replay_guard.check_and_record(&entry.payload.from, &entry.payload.nonce) {
            warn!(from = %entry.payload.from, nonce = %entry.payload.nonce, "rejecting replayed relay message");
            handled.push(entry.payload.message_id.clone());
            continue;
        }

        let verified = match directory.lookup(&entry.payload.from).await {
            Ok(public_key) => verify_payload(&entry.payload, &entry.signature, &public_key).unwrap_or(false),
            Err(_) => false,
        };

        let text = format_for_injection(&entry.payload.from, &entry.payload.kind, verified);
        if let Err(e) = bridge.inject_text(&text).await {
            warn!(error = %e, "failed to inject relay message, will retry next poll");
            continue;
        }
        handled.push(entry.payload.message_id.clone());
    }

    if !handled.is_empty() {
        ack(client, relay_url, identity, agent_name, &handled).await?;
    }
    Ok(handled)
}

async fn ack(
    client: &reqwest::Client,
    relay_url: &str,
    identity: &AgentIdentity,
    agent_name: &str,
    message_ids: &[String],
) -> Result<()> {
    #[derive(serde::Serialize)]
    struct AckBody<'a> {
        #[serde(rename = "messageIds")]
        message_ids: &'a [String],
    }
    let body = serde_json::to_vec(&AckBody { message_ids })?;
    let signature = identity.sign(&body);

    let url = format!("{}/relay/inbox/{}/ack", relay_url.trim_end_matches('/'), agent_name);
    let resp = client
        .post(&url)
        .header("X-Agent", agent_name)
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
        let text = resp.text().await.unwrap_or_default();
        Err(NetworkError::RelayRejected { status, body: text })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verified_message_gets_network_prefix() {
        let text = format_for_injection("hearth-beta", &AgentMessageKind::Text { text: "ping".into() }, true);
        assert_eq!(text, "[Network] hearth-beta: ping");
    }

    #[test]
    fn unverified_message_gets_marker() {
        let text = format_for_injection("hearth-beta", &AgentMessageKind::Text { text: "ping".into() }, false);
        assert_eq!(text, "[Network] [UNVERIFIED] hearth-beta: ping");
    }
}

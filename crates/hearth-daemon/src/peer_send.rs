//! `sendToPeer` (§4.8, S3): try the LAN transport first, falling back to
//! the Ed25519 relay when the peer isn't configured for LAN or the LAN
//! send fails. Lives here rather than in `hearth-peer`/`hearth-network`
//! since it is the one place both transports are in scope together.

use crate::app::AppState;
use crate::error::{DaemonError, Result};
use hearth_core::types::{AgentMessage, AgentMessageKind};
use hearth_peer::types::{PeerDirection, PeerTransportKind};
use std::sync::Arc;
use tracing::{info, warn};

/// Deliver `kind` to `peer_name`, preferring the configured LAN peer list
/// and falling back to the relay (signed, addressed by agent name) when
/// LAN isn't an option for this peer.
pub async fn send_to_peer(state: &Arc<AppState>, peer_name: &str, kind: AgentMessageKind) -> Result<()> {
    let msg = AgentMessage::new(state.config.agent.name.clone(), kind.clone());

    if let Some(lan) = &state.lan_client {
        if lan.is_configured(peer_name) {
            let outcome = lan.send(peer_name, &msg).await;
            let ok = outcome.is_ok();
            let _ = state.peer_comms_log.record(
                PeerDirection::Out,
                peer_name,
                PeerTransportKind::Lan,
                &msg.message_id,
                ok,
            );
            return match outcome {
                Ok(()) => {
                    info!(peer = %peer_name, "delivered via LAN");
                    Ok(())
                }
                Err(e) => {
                    warn!(peer = %peer_name, error = %e, "LAN send failed, falling back to relay");
                    send_via_relay(state, peer_name, kind, &msg.message_id).await
                }
            };
        }
    }

    send_via_relay(state, peer_name, kind, &msg.message_id).await
}

async fn send_via_relay(
    state: &Arc<AppState>,
    peer_name: &str,
    kind: AgentMessageKind,
    message_id: &str,
) -> Result<()> {
    let network = state
        .network
        .as_ref()
        .ok_or_else(|| DaemonError::Validation("no LAN route and network relay is not enabled".to_string()))?;

    let result = hearth_network::send::send(
        &state.http_client,
        &network.relay_url,
        &network.identity,
        &state.config.agent.name,
        peer_name,
        kind,
    )
    .await;
    let ok = result.is_ok();
    let _ = state.peer_comms_log.record(
        PeerDirection::Out,
        peer_name,
        PeerTransportKind::Relay,
        message_id,
        ok,
    );
    result.map_err(DaemonError::from)
}

//! `/agent/*` endpoints (spec.md §4.7, §6.1): inbound LAN peer messages,
//! this agent's own idle/busy probe, and the outbound helper used by local
//! scripts to reach a named peer.

use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

use hearth_bridge::InjectOutcome;
use hearth_core::types::AgentMessageKind;
use hearth_peer::inbound;
use hearth_peer::types::{PeerDirection, PeerTransportKind};

use crate::app::AppState;

#[derive(Deserialize)]
pub struct InboundAgentMessage {
    pub from: String,
    #[serde(flatten)]
    pub kind: AgentMessageKind,
    #[serde(default)]
    pub message_id: Option<String>,
}

/// `POST /agent/message` — inbound LAN peer message (§4.7).
///
/// Auth is a shared bearer secret, not per-sender identity, so a bad bearer
/// is tracked by source IP (§7 `AuthFailure`) rather than by `from`.
pub async fn inbound_message(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(payload): Json<InboundAgentMessage>,
) -> (StatusCode, Json<Value>) {
    let source = addr.ip().to_string();

    if state.auth_failures.is_refused(&source) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "source temporarily refused after repeated auth failures"})),
        );
    }

    let auth_ok = inbound::bearer_matches(
        headers.get("authorization").and_then(|v| v.to_str().ok()),
        &state.peer_shared_secret,
    );
    if !auth_ok {
        state.auth_failures.record_failure(&source);
        warn!(source = %source, "bad bearer on /agent/message");
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "unauthorized"})));
    }
    state.auth_failures.clear(&source);

    let message_id = payload.message_id.clone().unwrap_or_default();

    match inbound::inject(&state.bridge, &payload.from, &payload.kind).await {
        Ok(InjectOutcome::Injected) => {
            state.mark_injected();
            let _ = state.peer_comms_log.record(
                PeerDirection::In,
                &payload.from,
                PeerTransportKind::Lan,
                &message_id,
                true,
            );
            info!(from = %payload.from, "peer message injected");
            crate::turn::await_and_route(&state, state.last_injected_at()).await;
            (StatusCode::OK, Json(json!({"ok": true, "queued": false})))
        }
        // §7 SessionAbsent: "respond {ok:true, queued:true} and retain the
        // message in the standard log only" — there is no drain queue.
        Ok(InjectOutcome::SessionAbsent) => {
            let _ = state.peer_comms_log.record(
                PeerDirection::In,
                &payload.from,
                PeerTransportKind::Lan,
                &message_id,
                false,
            );
            (StatusCode::OK, Json(json!({"ok": true, "queued": true})))
        }
        Err(e) => {
            warn!(error = %e, "failed to inject peer message");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": e.to_string()})),
            )
        }
    }
}

/// `GET /agent/status` — this agent's idle/busy state and uptime.
pub async fn status(State(state): State<Arc<AppState>>) -> Json<Value> {
    let idle = state.bridge.is_agent_idle().await.unwrap_or(false);
    Json(json!({
        "ok": true,
        "name": state.config.agent.name,
        "idle": idle,
        "uptime_secs": state.started_at.elapsed().as_secs(),
    }))
}

#[derive(Deserialize)]
pub struct SendRequest {
    pub peer: String,
    #[serde(flatten)]
    pub kind: AgentMessageKind,
}

/// `POST /agent/send` — local-script helper that hands a message to
/// `sendToPeer` (§4.8 routing fallback: LAN first, then Relay).
pub async fn send(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SendRequest>,
) -> (StatusCode, Json<Value>) {
    match crate::peer_send::send_to_peer(&state, &req.peer, req.kind).await {
        Ok(()) => (StatusCode::OK, Json(json!({"ok": true}))),
        Err(e) => {
            warn!(peer = %req.peer, error = %e, "agent/send failed");
            (StatusCode::BAD_GATEWAY, Json(json!({"error": e.to_string()})))
        }
    }
}

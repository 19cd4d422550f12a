//! Per-provider chat-messenger webhook (spec.md §4.4). `app::build_router`
//! mounts this handler at each configured provider's `webhook_path`.

use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;

use hearth_channels::types::InboundMessage;
use hearth_chat::pipeline::{handle_inbound, PipelineOutcome};

use crate::app::AppState;

/// Provider-agnostic inbound webhook shape. Real provider payloads are
/// wider than this, but every bot-token messenger this daemon fronts
/// carries at least a sender id, optional display name, and a text body —
/// anything else in the payload rides along in `raw`.
#[derive(Deserialize)]
pub struct ChatWebhookPayload {
    pub sender_id: String,
    #[serde(default)]
    pub sender_name: Option<String>,
    pub text: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(flatten)]
    pub raw: Value,
}

pub async fn handle(
    state: Arc<AppState>,
    provider: String,
    payload: ChatWebhookPayload,
) -> (StatusCode, Json<Value>) {
    let Some(transport) = state.chat_transport(&provider).cloned() else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"error": format!("unknown chat provider '{provider}'")})),
        );
    };

    let msg = InboundMessage {
        channel: provider.clone(),
        sender_id: payload.sender_id,
        sender_name: payload.sender_name,
        content: payload.text,
        timestamp: payload
            .timestamp
            .unwrap_or_else(|| chrono::Utc::now().to_rfc3339()),
        raw_payload: Some(payload.raw),
    };

    state.mark_injected();
    let outcome = handle_inbound(
        &msg,
        &state.access,
        &state.bridge,
        state.router.state(),
        &state.router,
        transport.as_ref(),
        4_000,
    )
    .await;

    match outcome {
        Ok(PipelineOutcome::Injected) => {
            crate::turn::await_and_route(&state, state.last_injected_at()).await;
            (StatusCode::OK, Json(json!({"ok": true})))
        }
        Ok(other) => (StatusCode::OK, Json(json!({"ok": true, "outcome": format!("{other:?}")}))),
        Err(e) => {
            warn!(provider = %provider, error = %e, "chat webhook pipeline failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": e.to_string()})),
            )
        }
    }
}

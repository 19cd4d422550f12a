//! GET /status — session, peer, and delivery-channel snapshot for operators
//! and the `/agent/status` peer probe (spec.md §4.8).

use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::app::AppState;

pub async fn handle(State(state): State<Arc<AppState>>) -> Json<Value> {
    let session_exists = state.bridge.session_exists().await.unwrap_or(false);
    let busy = !state.bridge.is_agent_idle().await.unwrap_or(false);

    let peers: Vec<Value> = state
        .peer_states
        .snapshot()
        .into_iter()
        .map(|(name, info)| {
            json!({
                "name": name,
                "status": info.status,
                "updated_at": info.updated_at,
                "latency_ms": info.latency_ms,
            })
        })
        .collect();

    Json(json!({
        "session_exists": session_exists,
        "busy": busy,
        "channel": state.router.state().get().to_string(),
        "peers": peers,
        "uptime_secs": state.started_at.elapsed().as_secs(),
    }))
}

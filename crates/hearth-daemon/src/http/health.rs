use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::app::AppState;

/// GET /health — liveness probe. Always 200 once the process has a router
/// to serve it from; doesn't touch the Session Bridge or any peer.
pub async fn handle(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "agent": state.config.agent.name,
        "uptime_secs": state.started_at.elapsed().as_secs(),
    }))
}

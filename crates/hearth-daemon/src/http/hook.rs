//! POST /hook/response — layer 1 (hook-driven) capture, called synchronously
//! by the host immediately after a `Stop`/`SubagentStop`/`PostToolUse`/
//! `UserPromptSubmit` lifecycle event fires in the REPL.
//!
//! If the hook layer claims a response it's routed immediately. Otherwise
//! the retry loop and pane-capture layers are still running in the
//! background from whatever injection preceded this hook event, so there's
//! nothing further to do here — they'll route it if and when they win.

use axum::{extract::State, http::StatusCode, Json};
use hearth_core::types::HookEvent;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::app::AppState;

#[derive(Deserialize)]
pub struct HookPayload {
    /// Logged but not acted on: the daemon always tails its own configured
    /// transcript path (§9 Q1 — this module is authoritative), so a
    /// per-request path from the host is informational only.
    #[serde(default)]
    pub transcript_path: Option<String>,
    #[serde(default)]
    pub hook_event: Option<HookEvent>,
}

pub async fn handle(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<HookPayload>,
) -> StatusCode {
    if let Some(path) = &payload.transcript_path {
        debug!(transcript_path = %path, "hook notification received");
    }
    let injected_at = state.last_injected_at();
    let result = hearth_transcript::layers::hook_layer(&state.scanner, &state.coordinator, payload.hook_event, injected_at);

    match result {
        Ok(Some(resp)) => {
            crate::turn::route_response(&state, resp).await;
            StatusCode::OK
        }
        Ok(None) => StatusCode::OK,
        Err(e) => {
            warn!(error = %e, "hook-layer scan failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

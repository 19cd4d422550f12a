//! Per-turn orchestration: race the retry loop and pane-capture fallback
//! against each other after text has been injected into the REPL, and hand
//! whichever layer wins the claim to the Channel Router.
//!
//! The hook layer and background poll are not raced here — the hook layer
//! fires synchronously from `/hook/response` (see `http::hook`), and the
//! background poll runs continuously for the whole process lifetime (see
//! `main`), independent of any single turn.

use crate::app::AppState;
use hearth_core::types::AssistantResponse;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Race layers 2 and 3 (retry loop, pane capture) for one turn, routing
/// whichever produces the first claimed [`AssistantResponse`]. Called after
/// every injection (webhook message, peer message, scheduled prompt) that
/// isn't itself a hook notification.
pub async fn await_and_route(state: &Arc<AppState>, injected_at: Instant) {
    let retry = hearth_transcript::layers::retry_loop_layer(&state.scanner, &state.coordinator, injected_at);
    let pane = hearth_transcript::layers::pane_capture_layer(&state.bridge, &state.coordinator, injected_at);
    tokio::pin!(retry);
    tokio::pin!(pane);

    let resp = tokio::select! {
        Some(resp) = &mut retry => Some(resp),
        Some(resp) = &mut pane => Some(resp),
        else => None,
    };

    if let Some(resp) = resp {
        route_response(state, resp).await;
    } else {
        warn!("turn produced no deliverable response within either layer's horizon, capture exhausted");
        let elapsed_ms = injected_at.elapsed().as_millis() as u64;
        if let Err(e) = state.router.log_retry_exhausted(elapsed_ms) {
            warn!(error = %e, "failed to record retry-exhausted delivery record");
        }
    }
}

/// Hand a captured response to the Channel Router. The router owns its own
/// delivery logging (see `hearth_channels::router`), so there is nothing
/// left to record here.
pub async fn route_response(state: &Arc<AppState>, resp: AssistantResponse) {
    info!(layer = %resp.capture_layer, fingerprint = %resp.fingerprint, "routing captured response");
    if let Err(e) = state.router.route(&resp).await {
        warn!(error = %e, "channel router failed to deliver response");
    }
}

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Top-level daemon error, aggregating every subsystem's error type so HTTP
/// handlers can use `?` and still produce a typed status code (§7).
#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("{0}")]
    Validation(String),

    #[error("authentication failed")]
    AuthFailed,

    #[error("bridge error: {0}")]
    Bridge(#[from] hearth_bridge::BridgeError),

    #[error("access control error: {0}")]
    Access(#[from] hearth_access::AccessError),

    #[error("channel error: {0}")]
    Channel(#[from] hearth_channels::ChannelError),

    #[error("chat error: {0}")]
    Chat(#[from] hearth_chat::ChatError),

    #[error("peer error: {0}")]
    Peer(#[from] hearth_peer::PeerError),

    #[error("network error: {0}")]
    Network(#[from] hearth_network::NetworkError),

    #[error("scheduler error: {0}")]
    Scheduler(#[from] hearth_scheduler::SchedulerError),

    #[error("state error: {0}")]
    State(#[from] hearth_core::HearthError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl DaemonError {
    fn status(&self) -> StatusCode {
        match self {
            DaemonError::Validation(_) => StatusCode::BAD_REQUEST,
            DaemonError::AuthFailed => StatusCode::UNAUTHORIZED,
            DaemonError::Bridge(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for DaemonError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, DaemonError>;

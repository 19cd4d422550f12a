#[derive(Debug, thiserror::Error)]
pub enum PeerError {
    #[error("bearer token mismatch")]
    AuthFailed,

    #[error("missing required field: {0}")]
    ValidationFailure(&'static str),

    #[error("peer {0} has no configured host/port")]
    PeerNotConfigured(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out after {ms}ms")]
    Timeout { ms: u64 },

    #[error("bridge error: {0}")]
    Bridge(#[from] hearth_bridge::BridgeError),

    #[error("state error: {0}")]
    State(#[from] hearth_core::HearthError),
}

pub type Result<T> = std::result::Result<T, PeerError>;

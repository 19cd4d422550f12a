#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("no identity configured; run bootstrap first")]
    NoIdentity,

    #[error("signature verification failed")]
    BadSignature,

    #[error("replay detected")]
    ReplayDetected,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("relay rejected request: {status} {body}")]
    RelayRejected { status: u16, body: String },

    #[error("unknown public key for agent {0}")]
    UnknownAgent(String),

    #[error("secret store error: {0}")]
    SecretStore(#[from] hearth_core::HearthError),

    #[error("bridge error: {0}")]
    Bridge(#[from] hearth_bridge::BridgeError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, NetworkError>;

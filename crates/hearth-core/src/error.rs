use thiserror::Error;

/// The error taxonomy shared by every `hearth-*` crate.
///
/// Variants map onto the error kinds used to decide retry/escalation policy:
/// [`HearthError::TransientRemote`] and [`HearthError::CaptureExhausted`] are
/// retried with backoff, [`HearthError::PermanentRemote`] and
/// [`HearthError::ValidationFailure`] are not.
#[derive(Debug, Error)]
pub enum HearthError {
    #[error("configuration error: {0}")]
    Config(String),

    /// A remote call failed in a way that is likely to succeed on retry
    /// (timeout, 5xx, connection reset).
    #[error("transient remote error ({channel}): {0}", channel = .channel)]
    TransientRemote { channel: String, source: String },

    /// A remote call failed in a way retrying will not fix (4xx other than
    /// 429, malformed response, revoked credential).
    #[error("permanent remote error ({channel}): {0}", channel = .channel)]
    PermanentRemote { channel: String, source: String },

    #[error("validation failed: {0}")]
    ValidationFailure(String),

    #[error("authentication failed: {0}")]
    AuthFailure(String),

    /// No REPL session is attached for the addressed agent.
    #[error("no session attached: {0}")]
    SessionAbsent(String),

    /// On-disk state (JSON/JSONL/SQLite) could not be parsed or was found
    /// inconsistent with its schema.
    #[error("state corruption in {path}: {reason}")]
    StateCorruption { path: String, reason: String },

    /// All four transcript capture layers were exhausted without producing
    /// a usable response.
    #[error("transcript capture exhausted after {attempts} attempts")]
    CaptureExhausted { attempts: u32 },

    #[error("channel error ({channel}): {reason}")]
    Channel { channel: String, reason: String },

    #[error("secret store error: {0}")]
    SecretStore(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl HearthError {
    /// Short error code, used in structured log fields and HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            HearthError::Config(_) => "CONFIG_ERROR",
            HearthError::TransientRemote { .. } => "TRANSIENT_REMOTE",
            HearthError::PermanentRemote { .. } => "PERMANENT_REMOTE",
            HearthError::ValidationFailure(_) => "VALIDATION_FAILURE",
            HearthError::AuthFailure(_) => "AUTH_FAILURE",
            HearthError::SessionAbsent(_) => "SESSION_ABSENT",
            HearthError::StateCorruption { .. } => "STATE_CORRUPTION",
            HearthError::CaptureExhausted { .. } => "CAPTURE_EXHAUSTED",
            HearthError::Channel { .. } => "CHANNEL_ERROR",
            HearthError::SecretStore(_) => "SECRET_STORE_ERROR",
            HearthError::Serialization(_) => "SERIALIZATION_ERROR",
            HearthError::Io(_) => "IO_ERROR",
            HearthError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether a caller should retry this error with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            HearthError::TransientRemote { .. } | HearthError::CaptureExhausted { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, HearthError>;

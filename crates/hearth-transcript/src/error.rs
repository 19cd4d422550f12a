use thiserror::Error;

#[derive(Debug, Error)]
pub enum TranscriptError {
    #[error("transcript file not found: {0}")]
    NotFound(String),

    #[error("malformed transcript line at offset {offset}: {reason}")]
    MalformedLine { offset: u64, reason: String },

    #[error("capture exhausted after {attempts} attempts")]
    CaptureExhausted { attempts: u32 },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bridge error: {0}")]
    Bridge(#[from] hearth_bridge::BridgeError),
}

pub type Result<T> = std::result::Result<T, TranscriptError>;

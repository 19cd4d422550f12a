use thiserror::Error;

#[derive(Debug, Error)]
pub enum SidecarError {
    #[error("binary not found: {0}")]
    BinaryNotFound(String),

    #[error("sidecar did not emit READY within {0:?}")]
    ReadyTimeout(std::time::Duration),

    #[error("sidecar exited before becoming ready")]
    ExitedBeforeReady,

    #[error("sidecar gave up after {0} consecutive restart failures")]
    RestartsExhausted(u32),

    #[error("sidecar is not running")]
    NotRunning,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SidecarError>;

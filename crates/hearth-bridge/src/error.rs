//! Error types for the hearth-bridge crate.

use thiserror::Error;

/// All errors that can originate from Session Bridge operations.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The `tmux` binary could not be located on `PATH`.
    #[error("tmux binary not found on PATH")]
    TmuxNotFound,

    /// `tmux` itself reported the target pane does not exist.
    #[error("tmux target not found: {0}")]
    TargetNotFound(String),

    /// `tmux` exited non-zero for a reason other than a missing target.
    #[error("tmux command failed: {0}")]
    CommandFailed(String),

    /// Underlying I/O failure spawning or communicating with `tmux`.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, BridgeError>;

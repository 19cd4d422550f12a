use thiserror::Error;

#[derive(Debug, Error)]
pub enum AccessError {
    #[error("state error: {0}")]
    State(#[from] hearth_core::HearthError),

    #[error("sender not known: {channel}/{external_id}")]
    UnknownSender { channel: String, external_id: String },
}

pub type Result<T> = std::result::Result<T, AccessError>;

/// Errors produced by the email adapter.
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("smtp error: {0}")]
    Smtp(String),

    #[error("imap error: {0}")]
    Imap(String),

    #[error("message parse error: {0}")]
    Parse(String),

    #[error("no credential configured for provider {0}")]
    NoCredential(String),

    #[error("channel error: {0}")]
    Channel(#[from] hearth_channels::ChannelError),

    #[error("bridge error: {0}")]
    Bridge(#[from] hearth_bridge::BridgeError),

    #[error("access control error: {0}")]
    Access(#[from] hearth_access::AccessError),

    #[error("state error: {0}")]
    State(#[from] hearth_core::HearthError),
}

pub type Result<T> = std::result::Result<T, EmailError>;

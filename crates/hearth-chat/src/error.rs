/// Errors produced by the chat-messenger adapter.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("no bot token configured")]
    NoToken,

    #[error("channel error: {0}")]
    Channel(#[from] hearth_channels::ChannelError),

    #[error("bridge error: {0}")]
    Bridge(#[from] hearth_bridge::BridgeError),

    #[error("state error: {0}")]
    State(#[from] hearth_core::HearthError),

    #[error("access control error: {0}")]
    Access(#[from] hearth_access::AccessError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ChatError>;

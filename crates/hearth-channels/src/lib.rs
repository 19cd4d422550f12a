//! `hearth-channels` — the `Channel` trait, `ChannelManager`, and the
//! Channel Router (dedup is handled upstream by `hearth-transcript`; this
//! crate owns rate-limiting, truncation, tone, and the channel-state atom).

pub mod channel;
pub mod error;
pub mod manager;
pub mod router;
pub mod state;
pub mod types;

pub use channel::Channel;
pub use error::ChannelError;
pub use manager::ChannelManager;
pub use router::ChannelRouter;
pub use state::ChannelStateStore;
pub use types::{ChannelStatus, InboundMessage, MessageFormat, OutboundMessage};

//! `hearth-peer` — LAN peer-to-peer agent messaging over a shared bearer
//! secret (spec.md §4.7): inbound validation/injection, outbound send with
//! a swappable native/subprocess HTTP transport, peer-state heartbeat, and
//! the rotating peer-comms log.

pub mod client;
pub mod error;
pub mod heartbeat;
pub mod inbound;
pub mod log;
pub mod transport;
pub mod types;

pub use client::LanClient;
pub use error::PeerError;
pub use heartbeat::PeerStateCache;
pub use inbound::AuthFailureTracker;
pub use log::PeerCommsLog;

//! `hearth-network` — the Ed25519 relay path (§4.8): identity bootstrap,
//! canonical-JSON signing, agent registration, outbound send, inbound
//! poll/verify/inject/ack, replay defense, and the cached public-key
//! directory.

pub mod directory;
pub mod error;
pub mod identity;
pub mod inbox;
pub mod nonce;
pub mod registry;
pub mod send;
pub mod signing;
pub mod types;

pub use directory::PublicKeyDirectory;
pub use error::NetworkError;
pub use identity::AgentIdentity;
pub use nonce::ReplayGuard;

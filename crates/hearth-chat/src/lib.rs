//! `hearth-chat` — the generic chat-messenger adapter (spec.md 4.4): webhook
//! inbound through Access Control and tiered injection, outbound send with
//! smart chunking and markdown-to-plain fallback. The provider's HTTP API
//! is opaque; [`transport::ChatTransport`] is the pluggable seam.

pub mod adapter;
pub mod chunking;
pub mod error;
pub mod pipeline;
pub mod send;
pub mod transport;
pub mod typing;

pub use adapter::ChatAdapter;
pub use error::ChatError;
pub use pipeline::{handle_inbound, PipelineOutcome};
pub use transport::{ChatTransport, HttpChatTransport};

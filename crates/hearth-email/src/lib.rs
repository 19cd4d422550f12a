//! `hearth-email` — email adapter(s): SMTP send via `lettre`, IMAP poll via
//! `imap`, both treated as pluggable providers behind [`EmailTransport`]
//! per spec.md §1's "opaque transport" framing. Inbound classification and
//! outbound chunking/rate-limiting reuse `hearth-access` and
//! `hearth-channels` exactly as `hearth-chat` does.

pub mod adapter;
pub mod error;
pub mod pipeline;
pub mod poll;
pub mod transport;
pub mod types;

pub use adapter::EmailAdapter;
pub use error::EmailError;
pub use transport::{EmailTransport, ImapConfig, SmtpImapTransport};
pub use types::InboundEmail;

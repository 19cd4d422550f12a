use hearth_core::types::AgentMessageKind;
use serde::{Deserialize, Serialize};

/// Wire body for `POST /relay/send` and the payload carried inside each
/// [`RelayInboxEntry`] (§4.8: `{from, to, type, text?, timestamp,
/// messageId, nonce, ...typeFields}`). Flat, not nested, so the canonical
/// JSON signed by the sender is exactly the bytes posted as the request
/// body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayMessage {
    pub from: String,
    pub to: String,
    #[serde(flatten)]
    pub kind: AgentMessageKind,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub message_id: String,
    pub nonce: String,
}

/// One entry fetched from `GET /relay/inbox/<name>`, still carrying its
/// detached signature. `verified` is computed locally after directory
/// lookup, not sent by the relay.
#[derive(Debug, Clone, Deserialize)]
pub struct RelayInboxEntry {
    pub payload: RelayMessage,
    pub signature: String,
}

/// Body of `POST /registry/agents` — idempotent on repeat registration of
/// the same public key (§4.8: "409 response triggers a status check").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRegistration {
    pub name: String,
    pub public_key: String,
    pub owner_email: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationStatus {
    Pending,
    Approved,
    Revoked,
}

#[derive(Debug, Clone)]
pub enum RegistrationOutcome {
    Registered,
    AlreadyRegistered(RegistrationStatus),
}

/// Directory lookup result for a single agent's public key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub name: String,
    pub public_key: String,
}

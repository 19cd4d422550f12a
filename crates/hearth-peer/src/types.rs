use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeerStatus {
    Idle,
    Busy,
    Unknown,
}

/// Cached view of one LAN peer (§3 `PeerState`), refreshed by the
/// `peer-heartbeat` scheduled task (§4.6/§4.8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerInfo {
    pub status: PeerStatus,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub latency_ms: Option<u64>,
}

impl Default for PeerInfo {
    fn default() -> Self {
        Self {
            status: PeerStatus::Unknown,
            updated_at: chrono::Utc::now(),
            latency_ms: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeerDirection {
    In,
    Out,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeerTransportKind {
    Lan,
    Relay,
}

/// One append-only record in `peer-comms.jsonl` (§6.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerCommsLogRecord {
    pub direction: PeerDirection,
    pub peer: String,
    pub transport: PeerTransportKind,
    pub message_id: String,
    pub ok: bool,
    pub recorded_at: chrono::DateTime<chrono::Utc>,
}

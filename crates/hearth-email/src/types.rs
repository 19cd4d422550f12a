use serde::{Deserialize, Serialize};

/// One fetched message, independent of whatever IMAP folder it came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundEmail {
    pub uid: u32,
    pub from_address: String,
    pub from_name: Option<String>,
    pub subject: String,
    pub body: String,
    pub received_at: chrono::DateTime<chrono::Utc>,
}

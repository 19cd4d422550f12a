use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Identifies a sender across the two persisted files and the rate limiter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SenderKey {
    pub channel: String,
    pub external_id: String,
}

impl SenderKey {
    pub fn new(channel: impl Into<String>, external_id: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            external_id: external_id.into(),
        }
    }

    pub(crate) fn cache_key(&self) -> String {
        format!("{}:{}", self.channel, self.external_id)
    }
}

/// Outcome of classifying a sender, checked in the fixed precedence order
/// `blocked -> primary -> approvedThirdParty -> recentlyDenied -> unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Blocked,
    Primary,
    ApprovedThirdParty,
    /// Denied within the last `RECENTLY_DENIED_WINDOW`; surfaced distinctly
    /// so the caller replies without re-queuing a fresh approval ask.
    RecentlyDenied,
    /// No record, a pending approval, or a stale denial/expired approval
    /// that hasn't been through the audit task yet.
    Unknown,
}

impl Classification {
    /// Whether the inbound message should be enqueued and the sender told a
    /// human will decide, per spec.md 4.4.
    pub fn is_held_for_human(&self) -> bool {
        matches!(self, Classification::RecentlyDenied | Classification::Unknown)
    }

    /// Injection prefix for the content handed to the Session Bridge, or
    /// `None` when the message isn't injected at all.
    pub fn injection_prefix(&self) -> Option<&'static str> {
        match self {
            Classification::Primary => Some(""),
            Classification::ApprovedThirdParty => Some("[3rdParty]"),
            _ => None,
        }
    }
}

/// `safe-senders.json` — `{channel: {users: [externalId, ...]}}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SafeSenders(pub HashMap<String, ChannelUsers>);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelUsers {
    pub users: Vec<String>,
}

impl SafeSenders {
    pub fn contains(&self, key: &SenderKey) -> bool {
        self.0
            .get(&key.channel)
            .map(|c| c.users.iter().any(|u| u == &key.external_id))
            .unwrap_or(false)
    }

    pub fn insert(&mut self, key: &SenderKey) {
        let entry = self.0.entry(key.channel.clone()).or_default();
        if !entry.users.iter().any(|u| u == &key.external_id) {
            entry.users.push(key.external_id.clone());
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThirdPartyStatus {
    Approved,
    Pending,
    Denied,
    Blocked,
}

/// One sender's record in `3rd-party-senders.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThirdPartyRecord {
    pub status: ThirdPartyStatus,
    pub display_name: Option<String>,
    pub approved_at: Option<chrono::DateTime<chrono::Utc>>,
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
    pub denied_at: Option<chrono::DateTime<chrono::Utc>>,
    pub first_seen_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl ThirdPartyRecord {
    pub fn pending_now(display_name: Option<String>) -> Self {
        let now = chrono::Utc::now();
        Self {
            status: ThirdPartyStatus::Pending,
            display_name,
            approved_at: None,
            expires_at: None,
            denied_at: None,
            first_seen_at: now,
            updated_at: now,
        }
    }
}

/// `3rd-party-senders.json` — `{channel: {externalId: ThirdPartyRecord}}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThirdPartySenders(pub HashMap<String, HashMap<String, ThirdPartyRecord>>);

impl ThirdPartySenders {
    pub fn get(&self, key: &SenderKey) -> Option<&ThirdPartyRecord> {
        self.0.get(&key.channel).and_then(|c| c.get(&key.external_id))
    }

    pub fn insert(&mut self, key: &SenderKey, record: ThirdPartyRecord) {
        self.0
            .entry(key.channel.clone())
            .or_default()
            .insert(key.external_id.clone(), record);
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &str, &mut ThirdPartyRecord)> {
        self.0.iter_mut().flat_map(|(channel, senders)| {
            senders
                .iter_mut()
                .map(move |(ext, rec)| (channel.as_str(), ext.as_str(), rec))
        })
    }
}

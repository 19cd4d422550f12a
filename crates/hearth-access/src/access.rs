//! The Access Control gate (spec.md 4.5): classifies inbound senders and
//! admits them against a sliding-window rate limit.
//!
//! Grounded on `UserResolver`'s shape — an in-process view held over a
//! durable store — generalized from a SQLite-backed cache-with-eviction to
//! two JSON files that are small enough to hold in memory in full and write
//! through on every mutation.

use crate::error::Result;
use crate::ratelimit::{Admission, SlidingWindowLimiter};
use crate::store::SenderStore;
use crate::types::{Classification, SafeSenders, SenderKey, ThirdPartyRecord, ThirdPartySenders, ThirdPartyStatus};
use std::sync::Mutex;
use std::time::Duration;
use tracing::info;

/// How long a denial keeps a sender in the `recentlyDenied` tier before it
/// falls back to `unknown` on the next classification.
const RECENTLY_DENIED_WINDOW: chrono::Duration = chrono::Duration::hours(24);

pub struct AccessControl {
    store: SenderStore,
    safe_senders: Mutex<SafeSenders>,
    third_party: Mutex<ThirdPartySenders>,
    limiter: Mutex<SlidingWindowLimiter>,
}

impl AccessControl {
    pub fn load(store: SenderStore, rate_limit_per_window: usize) -> Result<Self> {
        let safe_senders = store.load_safe_senders()?;
        let third_party = store.load_third_party()?;
        Ok(Self {
            store,
            safe_senders: Mutex::new(safe_senders),
            third_party: Mutex::new(third_party),
            limiter: Mutex::new(SlidingWindowLimiter::new(
                rate_limit_per_window,
                Duration::from_secs(60),
            )),
        })
    }

    /// Classify a sender in the fixed precedence order
    /// `blocked -> primary -> approvedThirdParty -> recentlyDenied -> unknown`.
    pub fn classify(&self, key: &SenderKey) -> Classification {
        let third_party = self.third_party.lock().unwrap();
        if let Some(record) = third_party.get(key) {
            if record.status == ThirdPartyStatus::Blocked {
                return Classification::Blocked;
            }
        }

        if self.safe_senders.lock().unwrap().contains(key) {
            return Classification::Primary;
        }

        if let Some(record) = third_party.get(key) {
            if record.status == ThirdPartyStatus::Approved {
                let still_valid = record
                    .expires_at
                    .map(|exp| exp > chrono::Utc::now())
                    .unwrap_or(true);
                if still_valid {
                    return Classification::ApprovedThirdParty;
                }
            }
            if record.status == ThirdPartyStatus::Denied {
                if let Some(denied_at) = record.denied_at {
                    if chrono::Utc::now() - denied_at < RECENTLY_DENIED_WINDOW {
                        return Classification::RecentlyDenied;
                    }
                }
            }
        }

        Classification::Unknown
    }

    /// First-contact registration: creates a `pending` third-party record if
    /// the sender has no record at all yet. A no-op for known senders.
    pub fn register_unknown(&self, key: &SenderKey, display_name: Option<String>) -> Result<()> {
        let mut third_party = self.third_party.lock().unwrap();
        if third_party.get(key).is_some() {
            return Ok(());
        }
        third_party.insert(key, ThirdPartyRecord::pending_now(display_name));
        self.store.save_third_party(&third_party)?;
        info!(channel = %key.channel, external_id = %key.external_id, "new sender registered pending");
        Ok(())
    }

    pub fn approve_third_party(&self, key: &SenderKey, valid_for: chrono::Duration) -> Result<()> {
        let mut third_party = self.third_party.lock().unwrap();
        let now = chrono::Utc::now();
        let record = third_party
            .get(key)
            .cloned()
            .unwrap_or_else(|| ThirdPartyRecord::pending_now(None));
        third_party.insert(
            key,
            ThirdPartyRecord {
                status: ThirdPartyStatus::Approved,
                approved_at: Some(now),
                expires_at: Some(now + valid_for),
                denied_at: None,
                updated_at: now,
                ..record
            },
        );
        self.store.save_third_party(&third_party)?;
        Ok(())
    }

    pub fn deny(&self, key: &SenderKey) -> Result<()> {
        let mut third_party = self.third_party.lock().unwrap();
        let now = chrono::Utc::now();
        let record = third_party
            .get(key)
            .cloned()
            .unwrap_or_else(|| ThirdPartyRecord::pending_now(None));
        third_party.insert(
            key,
            ThirdPartyRecord {
                status: ThirdPartyStatus::Denied,
                denied_at: Some(now),
                updated_at: now,
                ..record
            },
        );
        self.store.save_third_party(&third_party)?;
        Ok(())
    }

    pub fn block(&self, key: &SenderKey) -> Result<()> {
        let mut third_party = self.third_party.lock().unwrap();
        let now = chrono::Utc::now();
        let record = third_party
            .get(key)
            .cloned()
            .unwrap_or_else(|| ThirdPartyRecord::pending_now(None));
        third_party.insert(
            key,
            ThirdPartyRecord {
                status: ThirdPartyStatus::Blocked,
                updated_at: now,
                ..record
            },
        );
        self.store.save_third_party(&third_party)?;
        Ok(())
    }

    pub fn add_primary(&self, key: &SenderKey) -> Result<()> {
        let mut safe_senders = self.safe_senders.lock().unwrap();
        safe_senders.insert(key);
        self.store.save_safe_senders(&safe_senders)?;
        Ok(())
    }

    pub fn admit_inbound(&self, key: &SenderKey) -> Admission {
        self.limiter.lock().unwrap().admit(&key.cache_key())
    }

    /// Scheduled audit task (`approval-audit`, spec.md 4.6): demotes expired
    /// approvals back to `pending`. Returns how many were demoted.
    pub fn audit_expired_approvals(&self) -> Result<u32> {
        let mut third_party = self.third_party.lock().unwrap();
        let now = chrono::Utc::now();
        let mut demoted = 0u32;
        for (_channel, _external_id, record) in third_party.iter_mut() {
            if record.status == ThirdPartyStatus::Approved {
                if let Some(exp) = record.expires_at {
                    if exp <= now {
                        record.status = ThirdPartyStatus::Pending;
                        record.expires_at = None;
                        record.updated_at = now;
                        demoted += 1;
                    }
                }
            }
        }
        if demoted > 0 {
            self.store.save_third_party(&third_party)?;
            info!(demoted, "approval audit demoted expired approvals to pending");
        }
        Ok(demoted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn control(dir: &std::path::Path) -> AccessControl {
        let store = SenderStore::new(dir.join("safe.json"), dir.join("3rd.json"));
        AccessControl::load(store, 20).unwrap()
    }

    #[test]
    fn unknown_sender_classifies_as_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let ac = control(dir.path());
        let key = SenderKey::new("telegram", "1");
        assert_eq!(ac.classify(&key), Classification::Unknown);
    }

    #[test]
    fn primary_sender_takes_precedence_over_denial() {
        let dir = tempfile::tempdir().unwrap();
        let ac = control(dir.path());
        let key = SenderKey::new("telegram", "1");
        ac.deny(&key).unwrap();
        ac.add_primary(&key).unwrap();
        assert_eq!(ac.classify(&key), Classification::Primary);
    }

    #[test]
    fn blocked_overrides_everything() {
        let dir = tempfile::tempdir().unwrap();
        let ac = control(dir.path());
        let key = SenderKey::new("telegram", "1");
        ac.add_primary(&key).unwrap();
        ac.block(&key).unwrap();
        assert_eq!(ac.classify(&key), Classification::Blocked);
    }

    #[test]
    fn approved_third_party_is_recognized_until_expiry() {
        let dir = tempfile::tempdir().unwrap();
        let ac = control(dir.path());
        let key = SenderKey::new("telegram", "1");
        ac.approve_third_party(&key, chrono::Duration::days(30)).unwrap();
        assert_eq!(ac.classify(&key), Classification::ApprovedThirdParty);
    }

    #[test]
    fn denied_sender_is_recently_denied_then_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let ac = control(dir.path());
        let key = SenderKey::new("telegram", "1");
        ac.deny(&key).unwrap();
        assert_eq!(ac.classify(&key), Classification::RecentlyDenied);
    }

    #[test]
    fn audit_demotes_expired_approvals() {
        let dir = tempfile::tempdir().unwrap();
        let ac = control(dir.path());
        let key = SenderKey::new("telegram", "1");
        ac.approve_third_party(&key, chrono::Duration::seconds(-1)).unwrap();
        let demoted = ac.audit_expired_approvals().unwrap();
        assert_eq!(demoted, 1);
        assert_eq!(ac.classify(&key), Classification::Unknown);
    }

    #[test]
    fn rate_limiter_admits_then_queues() {
        let dir = tempfile::tempdir().unwrap();
        let store = SenderStore::new(dir.path().join("safe.json"), dir.path().join("3rd.json"));
        let ac = AccessControl::load(store, 1).unwrap();
        let key = SenderKey::new("telegram", "1");
        assert_eq!(ac.admit_inbound(&key), Admission::Allowed);
        assert_eq!(ac.admit_inbound(&key), Admission::Queued);
    }
}

//! Cached public-key directory (§4.8): looking up a peer agent's public key
//! on every inbound message would mean a relay round trip per message, so
//! results are cached with a short TTL and refreshed on miss or expiry.

use crate::error::{NetworkError, Result};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

const DIRECTORY_CAPACITY: usize = 256;
const ENTRY_TTL: Duration = Duration::from_secs(300);

struct CachedKey {
    public_key: String,
    fetched_at: Instant,
}

pub struct PublicKeyDirectory {
    relay_url: String,
    client: reqwest::Client,
    cache: Mutex<LruCache<String, CachedKey>>,
}

impl PublicKeyDirectory {
    pub fn new(relay_url: impl Into<String>) -> Self {
        Self {
            relay_url: relay_url.into(),
            client: reqwest::Client::new(),
            cache: Mutex::new(LruCache::new(NonZeroUsize::new(DIRECTORY_CAPACITY).unwrap())),
        }
    }

    /// Returns the cached key if fresh, otherwise fetches
    /// `GET {relay_url}/registry/agents/{agent_name}` and caches the result.
    pub async fn lookup(&self, agent_name: &str) -> Result<String> {
        if let Some(key) = self.cached(agent_name) {
            return Ok(key);
        }

        let url = format!("{}/registry/agents/{}", self.relay_url.trim_end_matches('/'), agent_name);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| NetworkError::Transport(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(NetworkError::UnknownAgent(agent_name.to_string()));
        }
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(NetworkError::RelayRejected { status, body });
        }

        let entry: crate::types::DirectoryEntry = resp
            .json()
            .await
            .map_err(|e| NetworkError::Transport(e.to_string()))?;

        self.cache.lock().unwrap().put(
            agent_name.to_string(),
            CachedKey {
                public_key: entry.public_key.clone(),
                fetched_at: Instant::now(),
            },
        );
        Ok(entry.public_key)
    }

    fn cached(&self, agent_name: &str) -> Option<String> {
        let mut cache = self.cache.lock().unwrap();
        let entry = cache.get(agent_name)?;
        if entry.fetched_at.elapsed() < ENTRY_TTL {
            Some(entry.public_key.clone())
        } else {
            cache.pop(agent_name);
            None
        }
    }

    pub fn invalidate(&self, agent_name: &str) {
        self.cache.lock().unwrap().pop(agent_name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_entry_is_served_from_cache() {
        let directory = PublicKeyDirectory::new("http://localhost:9999");
        directory.cache.lock().unwrap().put(
            "hearth-beta".to_string(),
            CachedKey { public_key: "pk123".into(), fetched_at: Instant::now() },
        );
        assert_eq!(directory.cached("hearth-beta"), Some("pk123".to_string()));
    }

    #[test]
    fn missing_entry_is_none() {
        let directory = PublicKeyDirectory::new("http://localhost:9999");
        assert_eq!(directory.cached("ghost"), None);
    }

    #[test]
    fn invalidate_clears_cached_entry() {
        let directory = PublicKeyDirectory::new("http://localhost:9999");
        directory.cache.lock().unwrap().put(
            "hearth-beta".to_string(),
            CachedKey { public_key: "pk123".into(), fetched_at: Instant::now() },
        );
        directory.invalidate("hearth-beta");
        assert_eq!(directory.cached("hearth-beta"), None);
    }
}

//! `peer-heartbeat` scheduled task body (§4.6, §4.8): refresh [`PeerInfo`]
//! for every configured LAN peer by hitting its `/agent/status` endpoint.

use crate::types::{PeerInfo, PeerStatus};
use dashmap::DashMap;
use hearth_core::config::PeerConfig;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

const STATUS_TIMEOUT: Duration = Duration::from_secs(3);

/// Read/write-locked (via `DashMap`) cache of every known peer's last
/// observed status, per §5's "peer-state cache is a map behind a
/// read/write lock".
#[derive(Clone)]
pub struct PeerStateCache {
    inner: Arc<DashMap<String, PeerInfo>>,
}

impl PeerStateCache {
    pub fn new() -> Self {
        Self { inner: Arc::new(DashMap::new()) }
    }

    pub fn get(&self, name: &str) -> PeerInfo {
        self.inner.get(name).map(|e| e.clone()).unwrap_or_default()
    }

    pub fn set(&self, name: &str, info: PeerInfo) {
        self.inner.insert(name.to_string(), info);
    }

    pub fn snapshot(&self) -> Vec<(String, PeerInfo)> {
        self.inner.iter().map(|e| (e.key().clone(), e.value().clone())).collect()
    }
}

impl Default for PeerStateCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Probe every configured peer's `/agent/status` endpoint and update the
/// cache. Unreachable peers are marked `Unknown` rather than removed, so a
/// peer that's merely rebooting doesn't get pruned out.
pub async fn refresh_all(client: &reqwest::Client, peers: &[PeerConfig], cache: &PeerStateCache) {
    for peer in peers {
        let url = format!("http://{}:{}/agent/status", peer.host, peer.port);
        let started = Instant::now();
        let info = match tokio::time::timeout(STATUS_TIMEOUT, client.get(&url).send()).await {
            Ok(Ok(resp)) if resp.status().is_success() => {
                let busy = resp
                    .json::<serde_json::Value>()
                    .await
                    .ok()
                    .and_then(|v| v.get("busy").and_then(|b| b.as_bool()))
                    .unwrap_or(false);
                PeerInfo {
                    status: if busy { PeerStatus::Busy } else { PeerStatus::Idle },
                    updated_at: chrono::Utc::now(),
                    latency_ms: Some(started.elapsed().as_millis() as u64),
                }
            }
            _ => {
                debug!(peer = %peer.name, "heartbeat probe failed, marking unknown");
                PeerInfo {
                    status: PeerStatus::Unknown,
                    updated_at: chrono::Utc::now(),
                    latency_ms: None,
                }
            }
        };
        cache.set(&peer.name, info);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_peer_defaults_to_unknown_status() {
        let cache = PeerStateCache::new();
        assert_eq!(cache.get("ghost").status, PeerStatus::Unknown);
    }

    #[test]
    fn set_then_get_roundtrips() {
        let cache = PeerStateCache::new();
        cache.set(
            "r2d2",
            PeerInfo {
                status: PeerStatus::Idle,
                updated_at: chrono::Utc::now(),
                latency_ms: Some(12),
            },
        );
        assert_eq!(cache.get("r2d2").status, PeerStatus::Idle);
    }
}

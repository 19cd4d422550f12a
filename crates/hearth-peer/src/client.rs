//! Outbound LAN send (§4.7): `POST /agent/message` with a bearer token
//! shared out-of-band between both agents.

use crate::error::{PeerError, Result};
use crate::transport::{LanSender, NativeLanSender, SubprocessLanSender};
use hearth_core::config::{LanTransport, PeerConfig};
use hearth_core::types::AgentMessage;
use std::collections::HashMap;

pub struct LanClient {
    peers: HashMap<String, PeerConfig>,
    shared_secret: String,
    sender: Box<dyn LanSender>,
}

impl LanClient {
    pub fn new(peers: Vec<PeerConfig>, shared_secret: String, transport: LanTransport) -> Self {
        let sender: Box<dyn LanSender> = match transport {
            LanTransport::Native => Box::new(NativeLanSender::new()),
            LanTransport::Subprocess => Box::new(SubprocessLanSender),
        };
        Self {
            peers: peers.into_iter().map(|p| (p.name.clone(), p)).collect(),
            shared_secret,
            sender,
        }
    }

    pub fn is_configured(&self, name: &str) -> bool {
        self.peers.contains_key(name)
    }

    /// Send `msg` to the named LAN peer. Fails fast with
    /// [`PeerError::PeerNotConfigured`] if the peer has no `host`/`port`
    /// entry, letting the caller's `sendToPeer` fallback (§4.8) try Relay.
    pub async fn send(&self, peer_name: &str, msg: &AgentMessage) -> Result<()> {
        let peer = self
            .peers
            .get(peer_name)
            .ok_or_else(|| PeerError::PeerNotConfigured(peer_name.to_string()))?;

        let url = format!("http://{}:{}/agent/message", peer.host, peer.port);
        let body = serde_json::to_string(msg).map_err(|e| PeerError::Transport(e.to_string()))?;
        self.sender.post_json(&url, &self.shared_secret, &body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearth_core::types::AgentMessageKind;

    #[tokio::test]
    async fn unconfigured_peer_fails_fast() {
        let client = LanClient::new(vec![], "secret".to_string(), LanTransport::Native);
        let msg = AgentMessage::new("me", AgentMessageKind::Text { text: "hi".into() });
        let err = client.send("r2d2", &msg).await.unwrap_err();
        assert!(matches!(err, PeerError::PeerNotConfigured(_)));
    }

    #[test]
    fn is_configured_reflects_peer_list() {
        let peers = vec![PeerConfig {
            name: "r2d2".into(),
            host: "192.168.1.42".into(),
            port: 3847,
        }];
        let client = LanClient::new(peers, "secret".to_string(), LanTransport::Native);
        assert!(client.is_configured("r2d2"));
        assert!(!client.is_configured("c3po"));
    }
}

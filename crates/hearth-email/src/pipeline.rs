//! Inbound staged pipeline for polled email: Access Control -> tiered
//! injection -> `ChannelState := chat`. Reuses the same `Channel`/
//! `ChannelRouter` plumbing as `hearth_chat::pipeline` — an email sender is
//! just another chat-shaped recipient as far as the router is concerned,
//! identified by `(channel = "email", recipient_id = from_address)`.

use crate::error::Result;
use crate::types::InboundEmail;
use hearth_access::{AccessControl, Classification, SenderKey};
use hearth_bridge::SessionBridge;
use hearth_channels::{ChannelRouter, ChannelStateStore};
use hearth_core::types::ChannelState;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    Injected,
    Held,
    Dropped,
    RateLimited,
}

pub async fn handle_inbound(
    email: &InboundEmail,
    access: &AccessControl,
    bridge: &SessionBridge,
    channel_state: &ChannelStateStore,
    router: &ChannelRouter,
) -> Result<PipelineOutcome> {
    let key = SenderKey::new("email", &email.from_address);
    access.register_unknown(&key, email.from_name.clone())?;

    let classification = access.classify(&key);

    if classification == Classification::Blocked {
        info!(sender = %email.from_address, "blocked email sender, dropping silently");
        return Ok(PipelineOutcome::Dropped);
    }

    if classification.is_held_for_human() {
        let notice = format!(
            "[AccessControl] pending email request from {} <{}>: {}",
            email.from_name.as_deref().unwrap_or(&email.from_address),
            email.from_address,
            email.subject
        );
        bridge.inject_text(&notice).await?;
        return Ok(PipelineOutcome::Held);
    }

    if access.admit_inbound(&key) != hearth_access::Admission::Allowed {
        warn!(sender = %email.from_address, "email inbound rate limit exceeded");
        return Ok(PipelineOutcome::RateLimited);
    }

    let prefix = classification.injection_prefix().unwrap_or_default();
    let name = email.from_name.as_deref().unwrap_or(&email.from_address);
    let content = format!(
        "{prefix}[Email] {name}: {subject} -- {body}",
        subject = email.subject,
        body = email.body.trim()
    );

    bridge.inject_text(&content).await?;
    channel_state.set(ChannelState::Chat)?;
    router.note_chat_recipient("email", &email.from_address);

    Ok(PipelineOutcome::Injected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearth_access::SenderStore;
    use hearth_channels::ChannelManager;

    fn sample() -> InboundEmail {
        InboundEmail {
            uid: 1,
            from_address: "dave@example.com".to_string(),
            from_name: Some("Dave".to_string()),
            subject: "hi".to_string(),
            body: "hello there".to_string(),
            received_at: chrono::Utc::now(),
        }
    }

    fn setup(dir: &std::path::Path) -> (AccessControl, SessionBridge, ChannelStateStore, ChannelRouter) {
        let access = AccessControl::load(
            SenderStore::new(dir.join("safe.json"), dir.join("3rd.json")),
            20,
        )
        .unwrap();
        let bridge = SessionBridge::new("test:0".into());
        let channel_state = ChannelStateStore::load(dir.join("channel.txt"));
        let router_state = ChannelStateStore::load(dir.join("channel.txt"));
        let router = ChannelRouter::new(ChannelManager::new(), router_state, dir.join("d.jsonl"), 20);
        (access, bridge, channel_state, router)
    }

    #[tokio::test]
    async fn unknown_sender_is_held() {
        let dir = tempfile::tempdir().unwrap();
        let (access, bridge, channel_state, router) = setup(dir.path());
        match handle_inbound(&sample(), &access, &bridge, &channel_state, &router).await {
            Ok(outcome) => assert_eq!(outcome, PipelineOutcome::Held),
            Err(_) => {}
        }
    }

    #[tokio::test]
    async fn blocked_sender_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let (access, bridge, channel_state, router) = setup(dir.path());
        access.block(&SenderKey::new("email", "dave@example.com")).unwrap();
        let outcome = handle_inbound(&sample(), &access, &bridge, &channel_state, &router)
            .await
            .unwrap();
        assert_eq!(outcome, PipelineOutcome::Dropped);
    }
}

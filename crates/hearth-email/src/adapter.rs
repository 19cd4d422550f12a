//! The email `Channel` adapter. Inbound delivery is poll-based (the
//! `email-check` scheduled task calls [`crate::pipeline::handle_inbound`]
//! for each freshly fetched message), so `connect`/`disconnect` here only
//! track status, mirroring `hearth_chat::adapter::ChatAdapter`.

use crate::transport::EmailTransport;
use async_trait::async_trait;
use hearth_channels::types::truncate_for_channel;
use hearth_channels::{Channel, ChannelError, ChannelStatus, OutboundMessage};
use std::sync::RwLock;
use tracing::warn;

const MAX_BODY_CHARS: usize = 20_000;

pub struct EmailAdapter {
    name: String,
    transport: Box<dyn EmailTransport>,
    status: RwLock<ChannelStatus>,
}

impl EmailAdapter {
    pub fn new(name: impl Into<String>, transport: Box<dyn EmailTransport>) -> Self {
        Self {
            name: name.into(),
            transport,
            status: RwLock::new(ChannelStatus::Disconnected),
        }
    }

    pub fn transport(&self) -> &dyn EmailTransport {
        self.transport.as_ref()
    }
}

#[async_trait]
impl Channel for EmailAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn connect(&mut self) -> Result<(), ChannelError> {
        *self.status.write().unwrap() = ChannelStatus::Connected;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), ChannelError> {
        *self.status.write().unwrap() = ChannelStatus::Disconnected;
        Ok(())
    }

    async fn send(&self, msg: &OutboundMessage) -> Result<(), ChannelError> {
        let body = truncate_for_channel(&msg.content, MAX_BODY_CHARS);
        if let Err(e) = self
            .transport
            .send(&msg.recipient_id, "Message from your agent", &body)
            .await
        {
            warn!(error = %e, "email send failed");
            return Err(ChannelError::SendFailed(e.to_string()));
        }
        Ok(())
    }

    fn status(&self) -> ChannelStatus {
        self.status.read().unwrap().clone()
    }
}

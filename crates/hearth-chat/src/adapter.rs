//! The chat-messenger `Channel` adapter.
//!
//! Inbound delivery is push-based (a webhook handled in `hearth-daemon`
//! calls into [`crate::pipeline::handle_inbound`] directly), so `connect`
//! and `disconnect` here only track the adapter's own status — there is no
//! persistent polling connection to hold open.

use crate::send::send_response;
use crate::transport::ChatTransport;
use async_trait::async_trait;
use hearth_channels::{Channel, ChannelError, ChannelStatus, OutboundMessage};
use std::sync::RwLock;

pub struct ChatAdapter {
    name: String,
    transport: Box<dyn ChatTransport>,
    max_chars: usize,
    status: RwLock<ChannelStatus>,
}

impl ChatAdapter {
    pub fn new(name: impl Into<String>, transport: Box<dyn ChatTransport>, max_chars: usize) -> Self {
        Self {
            name: name.into(),
            transport,
            max_chars,
            status: RwLock::new(ChannelStatus::Disconnected),
        }
    }

    pub fn transport(&self) -> &dyn ChatTransport {
        self.transport.as_ref()
    }
}

#[async_trait]
impl Channel for ChatAdapter {
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
        send_response(self.transport.as_ref(), &msg.recipient_id, &msg.content, self.max_chars).await;
        Ok(())
    }

    fn status(&self) -> ChannelStatus {
        self.status.read().unwrap().clone()
    }
}

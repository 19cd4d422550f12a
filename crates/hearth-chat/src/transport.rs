//! The provider's own HTTP API is treated as opaque (spec.md 4.4's scope
//! note); [`ChatTransport`] is the seam a concrete provider plugs into, and
//! [`HttpChatTransport`] is a generic bot-token-over-HTTP implementation
//! that covers any bot-token-based messenger API.

use crate::error::{ChatError, Result};
use async_trait::async_trait;
use serde_json::json;

#[async_trait]
pub trait ChatTransport: Send + Sync {
    fn name(&self) -> &str;
    async fn send_markdown(&self, recipient: &str, text: &str) -> Result<()>;
    async fn send_plain(&self, recipient: &str, text: &str) -> Result<()>;
    async fn send_typing(&self, recipient: &str) -> Result<()>;
}

/// Generic bot-token HTTP transport: `POST {api_base}/bot{token}/sendMessage`
/// and `.../sendChatAction`, matching the common Telegram-Bot-API-shaped
/// request format most bot-token messengers share.
pub struct HttpChatTransport {
    name: String,
    api_base: String,
    token: String,
    client: reqwest::Client,
}

impl HttpChatTransport {
    pub fn new(name: impl Into<String>, api_base: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            api_base: api_base.into(),
            token: token.into(),
            client: reqwest::Client::new(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }
}

#[async_trait]
impl ChatTransport for HttpChatTransport {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send_markdown(&self, recipient: &str, text: &str) -> Result<()> {
        let resp = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&json!({
                "chat_id": recipient,
                "text": text,
                "parse_mode": "MarkdownV2",
            }))
            .send()
            .await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(ChatError::Channel(hearth_channels::ChannelError::SendFailed(format!(
                "provider rejected markdown send: {}",
                resp.status()
            ))))
        }
    }

    async fn send_plain(&self, recipient: &str, text: &str) -> Result<()> {
        self.client
            .post(self.method_url("sendMessage"))
            .json(&json!({ "chat_id": recipient, "text": text }))
            .send()
            .await?;
        Ok(())
    }

    async fn send_typing(&self, recipient: &str) -> Result<()> {
        self.client
            .post(self.method_url("sendChatAction"))
            .json(&json!({ "chat_id": recipient, "action": "typing" }))
            .send()
            .await?;
        Ok(())
    }
}

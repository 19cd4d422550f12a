//! Email is treated as an opaque transport per spec.md §1: `send(recipient,
//! payload)` and `fetchIncoming()`. [`EmailTransport`] is the seam a
//! concrete provider plugs into; [`SmtpImapTransport`] is the one
//! production implementation, combining `lettre` (SMTP, send) with `imap`
//! (poll) the way the `the-snesler-spacebot` reference pairs the two crates
//! for a single mail account.
//!
//! Both libraries are blocking; every call here is wrapped in
//! `tokio::task::spawn_blocking` so the async runtime's worker threads are
//! never stalled waiting on socket I/O, mirroring the pattern
//! `hearth-bridge` uses for tmux subprocess calls (there via
//! `tokio::process`, here via `spawn_blocking` since `imap`/`lettre`'s sync
//! transports have no Tokio-native equivalent in this stack).

use crate::error::{EmailError, Result};
use crate::types::InboundEmail;
use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use mailparse::MailHeaderMap;

#[async_trait]
pub trait EmailTransport: Send + Sync {
    fn name(&self) -> &str;
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()>;
    async fn fetch_incoming(&self) -> Result<Vec<InboundEmail>>;
}

#[derive(Clone)]
pub struct ImapConfig {
    pub host: String,
    pub port: u16,
    pub mailbox: String,
}

pub struct SmtpImapTransport {
    name: String,
    smtp_host: String,
    smtp_port: u16,
    username: String,
    password: String,
    from_address: String,
    imap: Option<ImapConfig>,
}

impl SmtpImapTransport {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        smtp_host: impl Into<String>,
        smtp_port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
        from_address: impl Into<String>,
        imap: Option<ImapConfig>,
    ) -> Self {
        Self {
            name: name.into(),
            smtp_host: smtp_host.into(),
            smtp_port,
            username: username.into(),
            password: password.into(),
            from_address: from_address.into(),
            imap,
        }
    }

}

#[async_trait]
impl EmailTransport for SmtpImapTransport {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        let from: Mailbox = self
            .from_address
            .parse()
            .map_err(|e| EmailError::Smtp(format!("invalid from address: {e}")))?;
        let to: Mailbox = to
            .parse()
            .map_err(|e| EmailError::Smtp(format!("invalid recipient address: {e}")))?;

        let email = Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .body(body.to_string())
            .map_err(|e| EmailError::Smtp(e.to_string()))?;

        let smtp_host = self.smtp_host.clone();
        let smtp_port = self.smtp_port;
        let username = self.username.clone();
        let password = self.password.clone();

        tokio::task::spawn_blocking(move || {
            let creds = Credentials::new(username, password);
            let transport = SmtpTransport::relay(&smtp_host)
                .map_err(|e| EmailError::Smtp(e.to_string()))?
                .port(smtp_port)
                .credentials(creds)
                .build();
            transport
                .send(&email)
                .map_err(|e| EmailError::Smtp(e.to_string()))?;
            Ok::<(), EmailError>(())
        })
        .await
        .map_err(|e| EmailError::Smtp(e.to_string()))??;

        Ok(())
    }

    async fn fetch_incoming(&self) -> Result<Vec<InboundEmail>> {
        let Some(imap_cfg) = self.imap.clone() else {
            return Ok(Vec::new());
        };
        let username = self.username.clone();
        let password = self.password.clone();

        tokio::task::spawn_blocking(move || fetch_unseen(&imap_cfg, &username, &password))
            .await
            .map_err(|e| EmailError::Imap(e.to_string()))?
    }
}

fn fetch_unseen(cfg: &ImapConfig, username: &str, password: &str) -> Result<Vec<InboundEmail>> {
    let client = imap::ClientBuilder::new(&cfg.host, cfg.port)
        .connect()
        .map_err(|e| EmailError::Imap(e.to_string()))?;
    let mut session = client
        .login(username, password)
        .map_err(|(e, _client)| EmailError::Imap(e.to_string()))?;

    session
        .select(&cfg.mailbox)
        .map_err(|e| EmailError::Imap(e.to_string()))?;

    let uids = session
        .uid_search("UNSEEN")
        .map_err(|e| EmailError::Imap(e.to_string()))?;

    let mut messages = Vec::new();
    if uids.is_empty() {
        let _ = session.logout();
        return Ok(messages);
    }

    let uid_set = uids
        .iter()
        .map(|u| u.to_string())
        .collect::<Vec<_>>()
        .join(",");

    let fetched = session
        .uid_fetch(&uid_set, "RFC822")
        .map_err(|e| EmailError::Imap(e.to_string()))?;

    for msg in fetched.iter() {
        let Some(body) = msg.body() else { continue };
        match parse_message(msg.uid.unwrap_or(0), body) {
            Ok(email) => messages.push(email),
            Err(e) => tracing::warn!(error = %e, "skipping unparseable inbound email"),
        }
    }

    let _ = session.logout();
    Ok(messages)
}

fn parse_message(uid: u32, raw: &[u8]) -> Result<InboundEmail> {
    let parsed = mailparse::parse_mail(raw).map_err(|e| EmailError::Parse(e.to_string()))?;
    let headers = parsed.get_headers();

    let from_header = headers.get_first_value("From").unwrap_or_default();
    let (from_name, from_address) = split_display_name(&from_header);

    let subject = headers.get_first_value("Subject").unwrap_or_default();
    let body = parsed.get_body().map_err(|e| EmailError::Parse(e.to_string()))?;

    Ok(InboundEmail {
        uid,
        from_address,
        from_name,
        subject,
        body,
        received_at: chrono::Utc::now(),
    })
}

/// Split a `"Display Name <addr@example.com>"` header into its parts. Bare
/// addresses with no display name return `(None, addr)`.
fn split_display_name(header: &str) -> (Option<String>, String) {
    if let Some(open) = header.rfind('<') {
        if let Some(close) = header.rfind('>') {
            if close > open {
                let name = header[..open].trim().trim_matches('"').to_string();
                let addr = header[open + 1..close].trim().to_string();
                return (if name.is_empty() { None } else { Some(name) }, addr);
            }
        }
    }
    (None, header.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_display_name_and_address() {
        let (name, addr) = split_display_name("Dave Example <dave@example.com>");
        assert_eq!(name, Some("Dave Example".to_string()));
        assert_eq!(addr, "dave@example.com");
    }

    #[test]
    fn bare_address_has_no_display_name() {
        let (name, addr) = split_display_name("dave@example.com");
        assert_eq!(name, None);
        assert_eq!(addr, "dave@example.com");
    }
}

//! Outbound LAN transport (§4.7, §9's "subprocess-shaped HTTP for LAN"
//! design note): a platform idiosyncrasy can make the built-in HTTP stack
//! refuse outbound connections to LAN IPs while a `curl` subprocess
//! succeeds. [`LanSender`] is the swappable seam; [`NativeLanSender`] is
//! the default, [`SubprocessLanSender`] is the documented fallback.

use crate::error::{PeerError, Result};
use async_trait::async_trait;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const TOTAL_TIMEOUT: Duration = Duration::from_secs(10);

#[async_trait]
pub trait LanSender: Send + Sync {
    async fn post_json(&self, url: &str, bearer: &str, body: &str) -> Result<()>;
}

/// The default path: the language's native HTTP client (`reqwest`), per
/// §9's "the expected path is to use the language's native HTTP client".
pub struct NativeLanSender {
    client: reqwest::Client,
}

impl NativeLanSender {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .connect_timeout(CONNECT_TIMEOUT)
                .timeout(TOTAL_TIMEOUT)
                .build()
                .unwrap_or_default(),
        }
    }
}

impl Default for NativeLanSender {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LanSender for NativeLanSender {
    async fn post_json(&self, url: &str, bearer: &str, body: &str) -> Result<()> {
        let resp = timeout(
            TOTAL_TIMEOUT,
            self.client
                .post(url)
                .bearer_auth(bearer)
                .header("content-type", "application/json")
                .body(body.to_string())
                .send(),
        )
        .await
        .map_err(|_| PeerError::Timeout { ms: TOTAL_TIMEOUT.as_millis() as u64 })?
        .map_err(|e| PeerError::Transport(e.to_string()))?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(PeerError::Transport(format!("peer rejected message: {}", resp.status())))
        }
    }
}

/// The documented fallback: shell out to `curl`. Same request shape, a
/// different socket path under the hood.
pub struct SubprocessLanSender;

#[async_trait]
impl LanSender for SubprocessLanSender {
    async fn post_json(&self, url: &str, bearer: &str, body: &str) -> Result<()> {
        use tokio::io::AsyncWriteExt;

        let curl = which::which("curl").map_err(|_| PeerError::Transport("curl not found on PATH".into()))?;

        let run = async {
            let mut child = Command::new(curl)
                .args([
                    "-sS",
                    "--connect-timeout",
                    "5",
                    "--max-time",
                    "10",
                    "-X",
                    "POST",
                    "-H",
                    "content-type: application/json",
                    "-H",
                    &format!("Authorization: Bearer {bearer}"),
                    "--data-binary",
                    "@-",
                    "-o",
                    "/dev/null",
                    "-w",
                    "%{http_code}",
                    url,
                ])
                .kill_on_drop(true)
                .stdin(std::process::Stdio::piped())
                .stdout(std::process::Stdio::piped())
                .stderr(std::process::Stdio::piped())
                .spawn()
                .map_err(|e| PeerError::Transport(e.to_string()))?;

            if let Some(mut stdin) = child.stdin.take() {
                stdin
                    .write_all(body.as_bytes())
                    .await
                    .map_err(|e| PeerError::Transport(e.to_string()))?;
            }

            child
                .wait_with_output()
                .await
                .map_err(|e| PeerError::Transport(e.to_string()))
        };

        let output = timeout(TOTAL_TIMEOUT, run)
            .await
            .map_err(|_| PeerError::Timeout { ms: TOTAL_TIMEOUT.as_millis() as u64 })??;

        let code = String::from_utf8_lossy(&output.stdout);
        if code.trim().starts_with('2') {
            Ok(())
        } else {
            Err(PeerError::Transport(format!(
                "curl reported status {code}: {}",
                String::from_utf8_lossy(&output.stderr)
            )))
        }
    }
}

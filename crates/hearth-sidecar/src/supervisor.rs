//! Sidecar lifecycle contract (§4.9): `start`/`health`/`restart`/`stop` for
//! an isolated child process such as a browser-automation helper or a
//! speech engine. The daemon proxies a narrow set of endpoints to each
//! sidecar; everything past the lifecycle boundary is out of scope here.

use crate::error::{Result, SidecarError};
use crate::types::{SidecarHealth, SidecarSpec};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::time::timeout;
use tracing::{info, warn};

const MAX_CONSECUTIVE_RESTART_FAILURES: u32 = 3;
const READY_TOKEN: &str = "READY";

pub struct SidecarSupervisor {
    spec: SidecarSpec,
    client: reqwest::Client,
    child: Mutex<Option<Child>>,
    consecutive_failures: AtomicU32,
}

impl SidecarSupervisor {
    pub fn new(spec: SidecarSpec) -> Self {
        Self {
            spec,
            client: reqwest::Client::new(),
            child: Mutex::new(None),
            consecutive_failures: AtomicU32::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    /// Spawn the child, piping stdout/stderr, and wait for a literal
    /// `READY` line on stdout within the declared startup timeout.
    pub async fn start(&self) -> Result<()> {
        which::which(&self.spec.command)
            .map_err(|_| SidecarError::BinaryNotFound(self.spec.command.clone()))?;

        let mut command = Command::new(&self.spec.command);
        command
            .args(&self.spec.args)
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped());

        let mut child = command.spawn()?;
        let stdout = child.stdout.take().expect("piped stdout");
        let mut lines = BufReader::new(stdout).lines();

        let wait_for_ready = async {
            loop {
                match lines.next_line().await? {
                    Some(line) if line.trim() == READY_TOKEN => return Ok(()),
                    Some(_) => continue,
                    None => return Err(SidecarError::ExitedBeforeReady),
                }
            }
        };

        match timeout(self.spec.startup_timeout, wait_for_ready).await {
            Ok(Ok(())) => {
                info!(sidecar = %self.spec.name, "sidecar ready");
                *self.child.lock().unwrap() = Some(child);
                self.consecutive_failures.store(0, Ordering::SeqCst);
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = child.start_kill();
                Err(e)
            }
            Err(_) => {
                let _ = child.start_kill();
                Err(SidecarError::ReadyTimeout(self.spec.startup_timeout))
            }
        }
    }

    /// `GET /health` on the child's HTTP port; a single failed probe marks
    /// the sidecar unhealthy — no retry within this call.
    pub async fn health(&self) -> SidecarHealth {
        if self.child.lock().unwrap().is_none() {
            return SidecarHealth::NotStarted;
        }
        let url = format!("http://127.0.0.1:{}/health", self.spec.health_port);
        let probe = self.client.get(&url).send();
        match timeout(self.spec.health_timeout, probe).await {
            Ok(Ok(resp)) if resp.status().is_success() => SidecarHealth::Healthy,
            _ => SidecarHealth::Unhealthy,
        }
    }

    /// SIGTERM the current child, reap it, and re-`start()`. Gives up
    /// after `MAX_CONSECUTIVE_RESTART_FAILURES` in a row.
    pub async fn restart(&self) -> Result<()> {
        self.terminate_current().await;

        match self.start().await {
            Ok(()) => Ok(()),
            Err(e) => {
                let failures = self.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1;
                if failures >= MAX_CONSECUTIVE_RESTART_FAILURES {
                    warn!(sidecar = %self.spec.name, failures, "giving up on sidecar restarts");
                    Err(SidecarError::RestartsExhausted(failures))
                } else {
                    Err(e)
                }
            }
        }
    }

    /// SIGTERM on daemon shutdown.
    pub async fn stop(&self) {
        self.terminate_current().await;
    }

    async fn terminate_current(&self) {
        let child = self.child.lock().unwrap().take();
        if let Some(mut child) = child {
            if let Some(pid) = child.id() {
                unsafe {
                    libc::kill(pid as libc::pid_t, libc::SIGTERM);
                }
            }
            let _ = child.wait().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn health_before_start_is_not_started() {
        let spec = SidecarSpec::new("test-sidecar", "true", 9999);
        let supervisor = SidecarSupervisor::new(spec);
        assert_eq!(supervisor.health().await, SidecarHealth::NotStarted);
    }

    #[tokio::test]
    async fn unknown_binary_fails_start() {
        let spec = SidecarSpec::new("ghost", "hearth-definitely-not-a-real-binary", 9999);
        let supervisor = SidecarSupervisor::new(spec);
        let err = supervisor.start().await.unwrap_err();
        assert!(matches!(err, SidecarError::BinaryNotFound(_)));
    }

    #[tokio::test]
    async fn start_times_out_waiting_for_ready_token() {
        // `sleep 5` never prints READY, so the declared startup timeout fires first.
        let mut spec = SidecarSpec::new("slow-sidecar", "sleep", 9999).with_args(vec!["5".into()]);
        spec.startup_timeout = Duration::from_millis(100);
        let supervisor = SidecarSupervisor::new(spec);
        let err = supervisor.start().await.unwrap_err();
        assert!(matches!(err, SidecarError::ReadyTimeout(_)));
    }
}

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 8787;
pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_RELAY_POLL_SECS: u64 = 30;
pub const DEFAULT_INBOUND_RATE_LIMIT: u32 = 20;
pub const DEFAULT_OUTBOUND_RATE_LIMIT: u32 = 20;

/// Top-level config (`hearth.toml` + `HEARTH_*` env overrides).
///
/// Loaded once at startup into an immutable snapshot passed through the
/// daemon's dependency-injection context — see §9's "Global mutable state"
/// design note. No subsystem re-reads the file directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HearthConfig {
    pub agent: AgentConfig,
    pub daemon: DaemonConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub channels: ChannelsConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default, rename = "agent-comms")]
    pub agent_comms: AgentCommsConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

/// The externally-spawned REPL this daemon observes (§3 `ReplSession`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// tmux target (`session`, `session:window`, or `session:window.pane`).
    pub pane_target: String,
    /// Path to the REPL's append-only transcript JSONL file.
    pub transcript_path: String,
    /// Where `channel.txt`, the sender-classification files, and the
    /// JSONL logs live. Defaults to `~/.hearth`.
    #[serde(default = "default_state_dir")]
    pub state_dir: String,
    /// Path to a small JSON file the REPL (or a wrapper script) updates
    /// with its current context-window usage, read by the
    /// `context-watchdog` scheduled task.
    #[serde(default = "default_context_usage_path")]
    pub context_usage_path: String,
}

fn default_state_dir() -> String {
    "~/.hearth".to_string()
}

fn default_context_usage_path() -> String {
    "~/.hearth/context-usage.json".to_string()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            pane_target: "hearth:0".to_string(),
            transcript_path: "~/.hearth/transcript.jsonl".to_string(),
            state_dir: default_state_dir(),
            context_usage_path: default_context_usage_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChannelsConfig {
    #[serde(default)]
    pub chat: ChatChannelConfig,
    #[serde(default)]
    pub email: EmailChannelConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChatChannelConfig {
    #[serde(default)]
    pub providers: Vec<ChatProviderConfig>,
}

/// One configured chat-messenger provider (Telegram-shaped, but generic —
/// any provider that speaks "webhook in, HTTP send out" fits this shape).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatProviderConfig {
    pub name: String,
    pub kind: String,
    /// Secret-store key suffix; the bot token itself never lives in this file.
    pub credential: String,
    #[serde(default)]
    pub webhook_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EmailChannelConfig {
    #[serde(default)]
    pub providers: Vec<EmailProviderConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailProviderConfig {
    pub name: String,
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub username: String,
    pub credential: String,
    pub from_address: String,
    #[serde(default)]
    pub poll_mailbox: Option<String>,
}

fn default_smtp_port() -> u16 {
    587
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SchedulerConfig {
    #[serde(default)]
    pub tasks: Vec<ScheduledTaskConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledTaskConfig {
    pub name: String,
    pub schedule: TaskScheduleConfig,
    #[serde(default = "bool_true")]
    pub enabled: bool,
    /// When true, the task is skipped (and rescheduled) while the REPL is busy.
    #[serde(default)]
    pub busy_gate: bool,
    /// Hard wall-clock ceiling in seconds; a run exceeding this is killed.
    #[serde(default)]
    pub max_duration: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskScheduleConfig {
    Interval { seconds: u64 },
    Cron { expr: String },
}

fn bool_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AgentCommsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub peers: Vec<PeerConfig>,
    /// Secret-store key suffix for the shared bearer token both sides of a
    /// LAN pairing hold. Credential itself never lives in this file.
    #[serde(default = "default_shared_secret_credential")]
    pub shared_secret_credential: String,
    /// §9's platform-idiosyncrasy note: LAN destinations sometimes need a
    /// subprocess (`curl`) transport when the native HTTP stack refuses
    /// outbound connections to LAN IPs. Swappable per deployment.
    #[serde(default)]
    pub lan_transport: LanTransport,
}

fn default_shared_secret_credential() -> String {
    "agent-comms-shared-secret".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LanTransport {
    #[default]
    Native,
    Subprocess,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerConfig {
    pub name: String,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub relay_url: Option<String>,
    #[serde(default)]
    pub owner_email: Option<String>,
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            relay_url: None,
            owner_email: None,
            poll_interval: DEFAULT_RELAY_POLL_SECS,
        }
    }
}

fn default_poll_interval() -> u64 {
    DEFAULT_RELAY_POLL_SECS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(default)]
    pub rate_limits: RateLimitsConfig,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            rate_limits: RateLimitsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitsConfig {
    #[serde(default = "default_inbound_rate_limit")]
    pub inbound_per_sender: u32,
    #[serde(default = "default_outbound_rate_limit")]
    pub outbound_per_recipient: u32,
}

impl Default for RateLimitsConfig {
    fn default() -> Self {
        Self {
            inbound_per_sender: DEFAULT_INBOUND_RATE_LIMIT,
            outbound_per_recipient: DEFAULT_OUTBOUND_RATE_LIMIT,
        }
    }
}

impl HearthConfig {
    /// Load config from a TOML file with `HEARTH_*` env var overrides.
    ///
    /// Checks in order: explicit path argument, then `~/.hearth/hearth.toml`.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let mut config: HearthConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("HEARTH_").split("__"))
            .extract()
            .map_err(|e| crate::error::HearthError::Config(e.to_string()))?;

        config.agent.name = config.agent.name.trim().to_lowercase();
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> crate::error::Result<()> {
        if self.agent.name.is_empty() {
            return Err(crate::error::HearthError::Config(
                "agent.name is required".to_string(),
            ));
        }
        if self.daemon.port == 0 {
            return Err(crate::error::HearthError::Config(
                "daemon.port is required".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_config_path() -> String {
    crate::state::expand_path("~/.hearth/hearth.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_name_is_lowercased() {
        let toml = r#"
            [agent]
            name = "Hearth-Bot"
            [daemon]
            port = 8787
        "#;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hearth.toml");
        std::fs::write(&path, toml).unwrap();

        let cfg = HearthConfig::load(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(cfg.agent.name, "hearth-bot");
    }

    #[test]
    fn missing_port_is_config_error() {
        let toml = r#"
            [agent]
            name = "hearth"
            [daemon]
            port = 0
        "#;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hearth.toml");
        std::fs::write(&path, toml).unwrap();

        let err = HearthConfig::load(Some(path.to_str().unwrap())).unwrap_err();
        assert_eq!(err.code(), "CONFIG_ERROR");
    }
}

//! Central dependency-injection context (spec.md §9: "provide config,
//! logger, secret store, and the channel-state atom through a single
//! context constructed at startup and passed explicitly, not through
//! unscoped globals").

use axum::routing::{get, post};
use axum::Router;
use hearth_access::{AccessControl, SenderStore};
use hearth_bridge::SessionBridge;
use hearth_channels::{ChannelManager, ChannelRouter, ChannelStateStore};
use hearth_chat::{ChatAdapter, ChatTransport, HttpChatTransport};
use hearth_core::config::HearthConfig;
use hearth_core::secrets::{FileSecretStore, KeyringSecretStore, SecretStore};
use hearth_email::{EmailAdapter, EmailTransport, ImapConfig, SmtpImapTransport};
use hearth_network::{AgentIdentity, PublicKeyDirectory, ReplayGuard};
use hearth_peer::{AuthFailureTracker, LanClient, PeerCommsLog, PeerStateCache};
use hearth_scheduler::SchedulerHandle;
use hearth_transcript::{CaptureCoordinator, NoiseFilter, TranscriptScanner};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{DaemonError, Result};

/// Default history capacity for the dedup LRU behind `CaptureCoordinator`.
const CAPTURE_DEDUP_CAPACITY: usize = 256;
/// Whether `thinking` content blocks are folded into captured text by default.
const INCLUDE_THINKING_DEFAULT: bool = false;
/// Per-message truncation ceiling for the push-based `ChatAdapter`, matching
/// `ChannelRouter`'s own `DEFAULT_MAX_OUTBOUND_CHARS`.
const CHAT_ADAPTER_MAX_CHARS: usize = 4_000;
/// Known chat-provider `kind` -> bot-token API base, Telegram-shaped per
/// `HttpChatTransport`'s doc comment. Providers outside this map fall back
/// to the Telegram base, since the wire shape (`/bot{token}/{method}`) is
/// shared by most bot-token messengers this daemon is expected to front.
fn chat_api_base(kind: &str) -> &'static str {
    match kind {
        "telegram" => "https://api.telegram.org",
        _ => "https://api.telegram.org",
    }
}

/// Network-path context, present only when `network.enabled = true`.
pub struct NetworkContext {
    pub identity: AgentIdentity,
    pub directory: PublicKeyDirectory,
    pub replay_guard: ReplayGuard,
    pub relay_url: String,
}

/// Everything an HTTP handler or background task needs, wired up once at
/// startup and shared behind `Arc` rather than reached through globals.
pub struct AppState {
    pub config: HearthConfig,
    pub bridge: Arc<SessionBridge>,
    pub scanner: Arc<TranscriptScanner>,
    pub coordinator: Arc<CaptureCoordinator>,
    pub access: Arc<AccessControl>,
    pub router: Arc<ChannelRouter>,
    pub chat_transports: HashMap<String, Arc<dyn ChatTransport>>,
    pub email_transports: HashMap<String, Arc<dyn EmailTransport>>,
    pub scheduler: SchedulerHandle,
    pub lan_client: Option<Arc<LanClient>>,
    pub auth_failures: Arc<AuthFailureTracker>,
    pub peer_states: PeerStateCache,
    pub peer_comms_log: Arc<PeerCommsLog>,
    pub network: Option<NetworkContext>,
    pub http_client: reqwest::Client,
    pub secrets: Arc<dyn SecretStore>,
    pub peer_shared_secret: String,
    pub started_at: Instant,
    /// When the most recent text injection happened, so the hook-layer
    /// handler (which the host calls after the fact, with no timing
    /// information of its own) can compute elapsed time.
    last_injected_at: std::sync::Mutex<Instant>,
}

impl AppState {
    pub fn chat_transport(&self, provider: &str) -> Option<&Arc<dyn ChatTransport>> {
        self.chat_transports.get(provider)
    }

    pub fn email_transport(&self, provider: &str) -> Option<&Arc<dyn EmailTransport>> {
        self.email_transports.get(provider)
    }

    /// Record that text was just injected into the REPL. Call this at every
    /// injection site (chat/email webhook, peer message, scheduled prompt)
    /// right before racing the capture layers.
    pub fn mark_injected(&self) -> Instant {
        let now = Instant::now();
        *self.last_injected_at.lock().unwrap() = now;
        now
    }

    /// The instant of the most recent injection, used by the hook-layer
    /// handler to compute `elapsed_ms`.
    pub fn last_injected_at(&self) -> Instant {
        *self.last_injected_at.lock().unwrap()
    }

    /// Wire every subsystem into a single shared context. This is the one
    /// place config becomes live objects — everything downstream takes an
    /// `Arc<AppState>`, never the config directly (§9 "Global mutable state").
    pub async fn new(config: HearthConfig) -> Result<Arc<Self>> {
        let state_dir = PathBuf::from(hearth_core::state::expand_path(&config.session.state_dir));
        std::fs::create_dir_all(&state_dir)?;

        let secrets: Arc<dyn SecretStore> = select_secret_store(&state_dir)?;

        let bridge = Arc::new(SessionBridge::new(config.session.pane_target.clone().into()));

        let transcript_path = PathBuf::from(hearth_core::state::expand_path(&config.session.transcript_path));
        let scanner = Arc::new(TranscriptScanner::new(transcript_path));
        let coordinator = Arc::new(CaptureCoordinator::new(
            CAPTURE_DEDUP_CAPACITY,
            INCLUDE_THINKING_DEFAULT,
            NoiseFilter::default_patterns(),
        ));

        let sender_store = SenderStore::new(
            state_dir.join("safe-senders.json"),
            state_dir.join("third-party-senders.json"),
        );
        let access = Arc::new(AccessControl::load(
            sender_store,
            config.security.rate_limits.inbound_per_sender as usize,
        )?);

        let mut manager = ChannelManager::new();
        let mut chat_transports: HashMap<String, Arc<dyn ChatTransport>> = HashMap::new();
        for provider in &config.channels.chat.providers {
            let token = secrets
                .get(&provider.credential)?
                .ok_or_else(|| DaemonError::Validation(format!(
                    "missing credential for chat provider '{}'",
                    provider.name
                )))?;
            let transport: Arc<dyn ChatTransport> = Arc::new(HttpChatTransport::new(
                provider.name.clone(),
                chat_api_base(&provider.kind),
                token,
            ));
            chat_transports.insert(provider.name.clone(), transport.clone());
            manager.register(Box::new(ChatAdapter::new(
                provider.name.clone(),
                Box::new(SharedChatTransport(transport)),
                CHAT_ADAPTER_MAX_CHARS,
            )));
        }

        let mut email_transports: HashMap<String, Arc<dyn EmailTransport>> = HashMap::new();
        for provider in &config.channels.email.providers {
            let password = secrets
                .get(&provider.credential)?
                .ok_or_else(|| DaemonError::Validation(format!(
                    "missing credential for email provider '{}'",
                    provider.name
                )))?;
            let imap = provider.poll_mailbox.clone().map(|mailbox| ImapConfig {
                host: provider.smtp_host.clone(),
                port: 993,
                mailbox,
            });
            let transport: Arc<dyn EmailTransport> = Arc::new(SmtpImapTransport::new(
                provider.name.clone(),
                provider.smtp_host.clone(),
                provider.smtp_port,
                provider.username.clone(),
                password,
                provider.from_address.clone(),
                imap,
            ));
            email_transports.insert(provider.name.clone(), transport.clone());
            manager.register(Box::new(EmailAdapter::new(
                provider.name.clone(),
                Box::new(SharedEmailTransport(transport)),
            )));
        }

        let channel_state = ChannelStateStore::load(state_dir.join("channel.txt"));
        let router = Arc::new(ChannelRouter::new(
            manager,
            channel_state,
            state_dir.join("delivery.jsonl"),
            config.security.rate_limits.outbound_per_recipient,
        ));

        let scheduler_conn = rusqlite::Connection::open(state_dir.join("scheduler.sqlite"))
            .map_err(hearth_scheduler::SchedulerError::from)?;
        let scheduler = SchedulerHandle::new(scheduler_conn)?;

        let agent_comms = &config.agent_comms;
        let lan_client = if agent_comms.enabled {
            let shared_secret = secrets
                .get(&agent_comms.shared_secret_credential)?
                .ok_or_else(|| DaemonError::Validation(
                    "agent-comms enabled but shared secret credential is missing".to_string(),
                ))?;
            Some(Arc::new(LanClient::new(
                agent_comms.peers.clone(),
                shared_secret,
                agent_comms.lan_transport,
            )))
        } else {
            None
        };
        let peer_shared_secret = secrets.get(&agent_comms.shared_secret_credential)?.unwrap_or_default();

        let auth_failures = Arc::new(AuthFailureTracker::new());
        let peer_states = PeerStateCache::new();
        let peer_comms_log = Arc::new(PeerCommsLog::new(state_dir.join("peer-comms.jsonl")));

        let network = if config.network.enabled {
            let relay_url = config
                .network
                .relay_url
                .clone()
                .ok_or_else(|| DaemonError::Validation(
                    "network.enabled is true but relay_url is unset".to_string(),
                ))?;
            let identity = AgentIdentity::load_or_bootstrap(secrets.as_ref())?;
            let directory = PublicKeyDirectory::new(relay_url.clone());
            let replay_guard = ReplayGuard::new();
            Some(NetworkContext { identity, directory, replay_guard, relay_url })
        } else {
            None
        };

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| DaemonError::Validation(format!("failed to build http client: {e}")))?;

        Ok(Arc::new(Self {
            config,
            bridge,
            scanner,
            coordinator,
            access,
            router,
            chat_transports,
            email_transports,
            scheduler,
            lan_client,
            auth_failures,
            peer_states,
            peer_comms_log,
            network,
            http_client,
            secrets,
            peer_shared_secret,
            started_at: Instant::now(),
            last_injected_at: std::sync::Mutex::new(Instant::now()),
        }))
    }
}

/// Prefer the OS-native keyring; fall back to a file-backed store on
/// headless hosts where no Secret Service / Keychain is reachable.
fn select_secret_store(state_dir: &std::path::Path) -> Result<Arc<dyn SecretStore>> {
    let keyring = KeyringSecretStore::new();
    match keyring.get("keyring-probe") {
        Ok(_) => Ok(Arc::new(keyring)),
        Err(_) => {
            let store = FileSecretStore::new(state_dir.join("secrets.json"))
                .map_err(DaemonError::from)?;
            Ok(Arc::new(store))
        }
    }
}

/// `ChatAdapter`/`EmailAdapter` each own a boxed transport, but the same
/// transport instance also needs to live in `AppState::chat_transports` for
/// direct lookups (e.g. replying to a webhook on the provider it arrived
/// on). These forward to a shared `Arc` rather than constructing and
/// holding two independent clients per provider.
struct SharedChatTransport(Arc<dyn ChatTransport>);

#[async_trait::async_trait]
impl ChatTransport for SharedChatTransport {
    fn name(&self) -> &str {
        self.0.name()
    }
    async fn send_markdown(&self, recipient: &str, text: &str) -> hearth_chat::error::Result<()> {
        self.0.send_markdown(recipient, text).await
    }
    async fn send_plain(&self, recipient: &str, text: &str) -> hearth_chat::error::Result<()> {
        self.0.send_plain(recipient, text).await
    }
    async fn send_typing(&self, recipient: &str) -> hearth_chat::error::Result<()> {
        self.0.send_typing(recipient).await
    }
}

struct SharedEmailTransport(Arc<dyn EmailTransport>);

#[async_trait::async_trait]
impl EmailTransport for SharedEmailTransport {
    fn name(&self) -> &str {
        self.0.name()
    }
    async fn send(&self, to: &str, subject: &str, body: &str) -> hearth_email::error::Result<()> {
        self.0.send(to, subject, body).await
    }
    async fn fetch_incoming(&self) -> hearth_email::error::Result<Vec<hearth_email::InboundEmail>> {
        self.0.fetch_incoming().await
    }
}

/// Assemble the full Axum router: the six fixed endpoints from spec.md
/// §6.1, plus one concrete route per configured chat provider that
/// declares a `webhook_path` — no generic `/webhooks/:source` catch-all,
/// since the hook endpoint below is purpose-built for transcript-change
/// notifications and providers each get their own mounted path instead.
pub fn build_router(state: Arc<AppState>) -> Router {
    let mut router = Router::new()
        .route("/health", get(crate::http::health::handle))
        .route("/status", get(crate::http::status::handle))
        .route("/hook/response", post(crate::http::hook::handle))
        .route("/agent/message", post(crate::http::agent::inbound_message))
        .route("/agent/status", get(crate::http::agent::status))
        .route("/agent/send", post(crate::http::agent::send));

    for provider in &state.config.channels.chat.providers {
        let Some(path) = provider.webhook_path.clone() else {
            continue;
        };
        let name = provider.name.clone();
        router = router.route(
            &path,
            post(
                move |axum::extract::State(state): axum::extract::State<Arc<AppState>>,
                      axum::extract::Json(payload): axum::extract::Json<
                    crate::http::chat_webhook::ChatWebhookPayload,
                >| {
                    let name = name.clone();
                    async move { crate::http::chat_webhook::handle(state, name, payload).await }
                },
            ),
        );
    }

    router
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

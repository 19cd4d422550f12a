use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

mod app;
mod error;
mod http;
mod peer_send;
mod scheduler_jobs;
mod turn;

use hearth_core::config::HearthConfig;
use hearth_scheduler::{SchedulerEngine, SchedulerHandle};

/// Local-host agent daemon: bridges a REPL terminal to chat, email, and
/// peer-agent channels.
#[derive(Parser, Debug)]
#[command(name = "hearth-daemon", version)]
struct Cli {
    /// Path to `hearth.toml`. Falls back to `HEARTH_CONFIG`, then
    /// `~/.hearth/hearth.toml`.
    #[arg(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hearth_daemon=info,tower_http=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.or_else(|| std::env::var("HEARTH_CONFIG").ok());
    let config = HearthConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        warn!("config load failed ({e}), using defaults");
        HearthConfig::load(None).unwrap_or_else(|_| {
            panic!("no usable config and `agent.name`/`daemon.port` have no defaults")
        })
    });

    let bind = config.daemon.bind.clone();
    let port = config.daemon.port;
    let state = app::AppState::new(config).await?;

    scheduler_jobs::bootstrap_jobs(&state.scheduler, &state.config)?;

    let shutdown = CancellationToken::new();
    let (engine_shutdown_tx, engine_shutdown_rx) = watch::channel(false);
    spawn_scheduler_engine(state.clone(), engine_shutdown_rx).await?;
    spawn_background_poll(state.clone(), shutdown.clone());

    let router = app::build_router(state.clone());
    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    info!(agent = %state.config.agent.name, %addr, "hearth daemon listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("shutting down, signalling background workers");
    shutdown.cancel();
    let _ = engine_shutdown_tx.send(true);
    tokio::time::sleep(Duration::from_secs(3)).await;

    Ok(())
}

/// Build a second connection to the same scheduler SQLite file `AppState`
/// already opened (one per `SchedulerHandle`/`SchedulerEngine`, per that
/// crate's doc comment), attach the Session Bridge for busy-gate checks,
/// and spawn the tick loop plus a consumer that dispatches fired jobs.
async fn spawn_scheduler_engine(
    state: Arc<app::AppState>,
    shutdown_rx: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let state_dir = std::path::PathBuf::from(hearth_core::state::expand_path(
        &state.config.session.state_dir,
    ));
    let conn = rusqlite::Connection::open(state_dir.join("scheduler.sqlite"))?;
    let (fired_tx, mut fired_rx) = mpsc::channel(64);
    let engine = SchedulerEngine::new(conn, Some(fired_tx))?.with_bridge(state.bridge.clone());

    tokio::spawn(engine.run(shutdown_rx));

    let dispatch_state = state.clone();
    tokio::spawn(async move {
        while let Some(job) = fired_rx.recv().await {
            scheduler_jobs::dispatch(dispatch_state.clone(), job).await;
        }
    });

    Ok(())
}

/// Layer 3's continuously-running worker (§4.2, §5: "Background poll
/// ticker: one"), draining claimed responses straight to the router.
fn spawn_background_poll(state: Arc<app::AppState>, shutdown: CancellationToken) {
    let (tx, mut rx) = mpsc::channel(16);
    let scanner = state.scanner.clone();
    let coordinator = state.coordinator.clone();
    let poll_shutdown = shutdown.clone();
    tokio::spawn(async move {
        hearth_transcript::layers::run_background_poll(&scanner, &coordinator, tx, poll_shutdown).await;
    });

    let route_state = state.clone();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                resp = rx.recv() => {
                    match resp {
                        Some(resp) => turn::route_response(&route_state, resp).await,
                        None => break,
                    }
                }
            }
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => error!("failed to install SIGTERM handler: {e}"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

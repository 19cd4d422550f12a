//! Bootstraps the built-in scheduled tasks (spec.md §4.6) into the
//! scheduler's SQLite store on startup, and dispatches fired jobs to their
//! bodies.
//!
//! Job identity is the task *name*: bootstrap is idempotent across restarts
//! because it skips any name already present in the store rather than
//! inserting a duplicate every time the daemon starts.

use crate::app::AppState;
use hearth_core::config::TaskScheduleConfig;
use hearth_scheduler::{Job, Schedule, SchedulerHandle};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

const CONTEXT_WATCHDOG: &str = "context-watchdog";
const PEER_HEARTBEAT: &str = "peer-heartbeat";
const MEMORY_SYNC: &str = "memory-sync";
const RELAY_INBOX_POLL: &str = "relay-inbox-poll";
const APPROVAL_AUDIT: &str = "approval-audit";
const EMAIL_CHECK: &str = "email-check";

const DEFAULT_MAX_DURATION_SECS: u64 = 30;

/// Default interval (seconds) for each built-in task when the operator's
/// config doesn't override it with an explicit `[[scheduler.tasks]]` entry.
fn default_interval_secs(name: &str) -> u64 {
    match name {
        CONTEXT_WATCHDOG => 60,
        PEER_HEARTBEAT => 30,
        MEMORY_SYNC => 900,
        RELAY_INBOX_POLL => 30,
        APPROVAL_AUDIT => 3_600,
        EMAIL_CHECK => 120,
        _ => 300,
    }
}

fn default_busy_gate(name: &str) -> bool {
    matches!(name, CONTEXT_WATCHDOG | MEMORY_SYNC)
}

const BUILTIN_TASKS: &[&str] = &[
    CONTEXT_WATCHDOG,
    PEER_HEARTBEAT,
    MEMORY_SYNC,
    RELAY_INBOX_POLL,
    APPROVAL_AUDIT,
    EMAIL_CHECK,
];

/// Insert every configured task plus any built-in task the config doesn't
/// already name, skipping names already present in the store.
pub fn bootstrap_jobs(handle: &SchedulerHandle, config: &hearth_core::config::HearthConfig) -> hearth_scheduler::Result<()> {
    let existing = handle.list_jobs()?;
    let existing_names: std::collections::HashSet<&str> = existing.iter().map(|j| j.name.as_str()).collect();

    for task in &config.scheduler.tasks {
        if !task.enabled || existing_names.contains(task.name.as_str()) {
            continue;
        }
        let schedule = match &task.schedule {
            TaskScheduleConfig::Interval { seconds } => Schedule::Interval { every_secs: *seconds },
            TaskScheduleConfig::Cron { expr } => Schedule::Cron { expression: expr.clone() },
        };
        handle.add_job_with_gates(&task.name, schedule, &task.name, task.busy_gate, task.max_duration)?;
        info!(task = %task.name, "scheduled task registered from config");
    }

    for name in BUILTIN_TASKS {
        if existing_names.contains(name) || config.scheduler.tasks.iter().any(|t| t.name == *name) {
            continue;
        }
        let schedule = Schedule::Interval { every_secs: default_interval_secs(name) };
        handle.add_job_with_gates(name, schedule, name, default_busy_gate(name), Some(DEFAULT_MAX_DURATION_SECS))?;
        info!(task = %name, "default built-in scheduled task registered");
    }

    Ok(())
}

/// Run one fired job's body under its declared (or default) max-duration,
/// logging and giving up silently on overrun per the busy-gate contract in
/// spec.md §4.6 ("on overrun, log and terminate").
pub async fn dispatch(state: Arc<AppState>, job: Job) {
    let max_duration = Duration::from_secs(job.max_duration_secs.unwrap_or(DEFAULT_MAX_DURATION_SECS));
    let name = job.name.clone();

    let body = run_body(state, job);
    match tokio::time::timeout(max_duration, body).await {
        Ok(Ok(())) => info!(task = %name, "scheduled task completed"),
        Ok(Err(e)) => warn!(task = %name, error = %e, "scheduled task failed"),
        Err(_) => error!(task = %name, seconds = max_duration.as_secs(), "scheduled task overran its max duration, terminated"),
    }
}

async fn run_body(state: Arc<AppState>, job: Job) -> anyhow::Result<()> {
    match job.name.as_str() {
        CONTEXT_WATCHDOG => context_watchdog(&state).await,
        PEER_HEARTBEAT => peer_heartbeat(&state).await,
        MEMORY_SYNC => memory_sync(&state).await,
        RELAY_INBOX_POLL => relay_inbox_poll(&state).await,
        APPROVAL_AUDIT => approval_audit(&state).await,
        EMAIL_CHECK => email_check(&state).await,
        other => {
            warn!(task = %other, "no body registered for scheduled task, skipping");
            Ok(())
        }
    }
}

#[derive(serde::Deserialize)]
struct ContextUsage {
    /// Fraction of the context window consumed, in `[0.0, 1.0]`.
    #[serde(alias = "usage_fraction", alias = "fraction")]
    fraction: f64,
}

/// Reads the context-usage file and, at 50%/65% thresholds, injects
/// `/save-state` and `/clear` via the Session Bridge (spec.md §4.6).
async fn context_watchdog(state: &Arc<AppState>) -> anyhow::Result<()> {
    let path = hearth_core::state::expand_path(&state.config.session.context_usage_path);
    let usage: Option<ContextUsage> =
        match hearth_core::state::read_json_state(std::path::Path::new(&path), None) {
            Ok(usage) => usage,
            Err(e) => {
                warn!(error = %e, "context-usage file unreadable, skipping this tick");
                return Ok(());
            }
        };
    let Some(usage) = usage else {
        return Ok(());
    };

    if usage.fraction >= 0.65 {
        info!(fraction = usage.fraction, "context usage at/above 65%, saving state and clearing");
        state.bridge.inject_text("/save-state").await?;
        state.bridge.inject_text("/clear").await?;
    } else if usage.fraction >= 0.50 {
        info!(fraction = usage.fraction, "context usage at/above 50%, saving state");
        state.bridge.inject_text("/save-state").await?;
    }
    Ok(())
}

async fn peer_heartbeat(state: &Arc<AppState>) -> anyhow::Result<()> {
    hearth_peer::heartbeat::refresh_all(&state.http_client, &state.config.agent_comms.peers, &state.peer_states).await;
    Ok(())
}

/// Triggers the agent's own memory-consolidation routine by injecting the
/// slash command the same way the context watchdog does, rather than
/// reimplementing whatever `/save-state` already does to disk.
async fn memory_sync(state: &Arc<AppState>) -> anyhow::Result<()> {
    state.bridge.inject_text("/save-state").await?;
    Ok(())
}

async fn relay_inbox_poll(state: &Arc<AppState>) -> anyhow::Result<()> {
    let Some(network) = &state.network else {
        return Ok(());
    };
    let handled = hearth_network::inbox::poll_once(
        &state.http_client,
        &network.relay_url,
        &network.identity,
        &state.config.agent.name,
        &network.directory,
        &network.replay_guard,
        &state.bridge,
    )
    .await?;
    if !handled.is_empty() {
        info!(count = handled.len(), "relay inbox poll handled messages");
    }
    Ok(())
}

async fn approval_audit(state: &Arc<AppState>) -> anyhow::Result<()> {
    let demoted = state.access.audit_expired_approvals()?;
    if demoted > 0 {
        info!(count = demoted, "demoted expired third-party approvals");
    }
    Ok(())
}

async fn email_check(state: &Arc<AppState>) -> anyhow::Result<()> {
    for (name, transport) in &state.email_transports {
        let injected = hearth_email::poll::check_provider(
            transport.as_ref(),
            &state.access,
            &state.bridge,
            state.router.state(),
            &state.router,
        )
        .await?;
        if injected > 0 {
            info!(provider = %name, count = injected, "injected email messages");
        }
    }
    Ok(())
}

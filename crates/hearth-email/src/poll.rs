//! The `email-check` scheduled task body (spec.md §4.6): fetch unseen
//! messages from every configured provider and run each through
//! [`crate::pipeline::handle_inbound`].

use crate::error::Result;
use crate::pipeline::{handle_inbound, PipelineOutcome};
use crate::transport::EmailTransport;
use hearth_access::AccessControl;
use hearth_bridge::SessionBridge;
use hearth_channels::ChannelRouter;
use hearth_channels::ChannelStateStore;
use tracing::{info, warn};

/// Poll one provider's inbox and inject every admissible unseen message.
/// Returns how many were injected.
pub async fn check_provider(
    transport: &dyn EmailTransport,
    access: &AccessControl,
    bridge: &SessionBridge,
    channel_state: &ChannelStateStore,
    router: &ChannelRouter,
) -> Result<u32> {
    let messages = transport.fetch_incoming().await?;
    let mut injected = 0u32;

    for email in messages {
        match handle_inbound(&email, access, bridge, channel_state, router).await {
            Ok(PipelineOutcome::Injected) => injected += 1,
            Ok(other) => {
                info!(provider = transport.name(), uid = email.uid, outcome = ?other, "email not injected");
            }
            Err(e) => {
                warn!(provider = transport.name(), uid = email.uid, error = %e, "email pipeline error");
            }
        }
    }

    Ok(injected)
}

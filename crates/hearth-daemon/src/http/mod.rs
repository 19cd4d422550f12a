//! HTTP endpoint handlers (spec.md §6.1). One module per route group;
//! `app::build_router` wires these into the Axum router.

pub mod agent;
pub mod chat_webhook;
pub mod health;
pub mod hook;
pub mod status;

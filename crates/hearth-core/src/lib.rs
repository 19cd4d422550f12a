//! `hearth-core` — shared config, error taxonomy, domain types, and the
//! secret-store adapter used by every other `hearth-*` crate.

pub mod config;
pub mod error;
pub mod secrets;
pub mod state;
pub mod types;

pub use error::{HearthError, Result};

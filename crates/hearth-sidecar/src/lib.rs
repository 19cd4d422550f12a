//! `hearth-sidecar` — lifecycle contract for isolated child processes the
//! daemon proxies a narrow set of endpoints to (§4.9): browser-automation
//! helpers, speech engines, and similar. The sidecars' own designs are out
//! of scope; this crate only owns spawn/health/restart/stop.

pub mod error;
pub mod supervisor;
pub mod types;

pub use error::SidecarError;
pub use supervisor::SidecarSupervisor;
pub use types::{SidecarHealth, SidecarSpec};

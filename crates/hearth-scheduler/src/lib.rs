//! `hearth-scheduler` — Tokio-based job scheduler with SQLite persistence.
//!
//! # Overview
//!
//! Jobs are persisted to a SQLite `jobs` table. The [`engine::SchedulerEngine`]
//! polls the database every second and executes any job whose `next_run` has
//! arrived, updating state and computing the next scheduled time. A job
//! marked `busy_gate` is skipped (and rescheduled, never dropped) while the
//! Session Bridge reports the REPL as busy; a job's `max_duration_secs`, if
//! set, is the caller's (not this crate's) ceiling for aborting an overrun
//! handler — the engine only carries the value through to the fired [`Job`].
//!
//! # Schedule variants
//!
//! | Variant    | Behaviour                                |
//! |------------|-------------------------------------------|
//! | `Once`     | Single fire at an absolute UTC instant     |
//! | `Interval` | Repeat every N seconds                     |
//! | `Daily`    | Fire at HH:MM UTC every day                |
//! | `Weekly`   | Fire at HH:MM UTC on a specific weekday    |
//! | `Cron`     | Standard 5-field cron expression           |

pub mod db;
pub mod engine;
pub mod error;
pub mod schedule;
pub mod types;

pub use engine::{SchedulerEngine, SchedulerHandle};
pub use error::{Result, SchedulerError};
pub use types::{Job, JobStatus, Schedule};

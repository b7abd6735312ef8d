//! # Cadence Core
//!
//! Shared types for the Cadence job scheduler:
//!
//! - [`Schedule`]: the validated registry of job definitions plus
//!   schedule-level event defaults
//! - [`JobSpec`]: one job's command, cron trigger, retry policy and cascade lists
//! - [`JobRun`]: the record of a single attempt
//! - [`OnEvent`]: follow-on actions (dependent jobs and webhooks) per outcome
//!
//! The engine, run log, notifier and API crates all speak in these types.

mod clock;
mod command;
mod cron_expr;
mod error;
mod event;
mod job;
mod run;
mod schedule;
pub mod template;

pub use clock::{Clock, SystemClock};
pub use command::Command;
pub use cron_expr::CronExpr;
pub use error::{CronError, ScheduleError, TemplateError};
pub use event::{OnEvent, Outcome};
pub use job::{DEFAULT_RECENT_RUNS, InFlightGuard, JobSpec, RecentRuns, storage_key};
pub use run::{JobRun, STATUS_NOT_COMPLETED};
pub use schedule::Schedule;

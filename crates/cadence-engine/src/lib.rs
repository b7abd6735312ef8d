//! # Cadence Engine
//!
//! Runs a validated [`Schedule`](cadence_core::Schedule):
//!
//! - [`Executor`] runs one attempt of a job as a child process
//! - [`JobRunner`] wraps attempts in the retry policy, records every attempt
//!   and fires the event cascade (dependent jobs and webhooks)
//! - [`ScheduleEngine`] ticks once a second, dispatches due jobs and handles
//!   the stop protocol
//!
//! ```text
//! tick ──▶ due jobs ──▶ JobRunner::run_with_retry ──▶ Executor::execute
//!                               │
//!                               ▼
//!                           finalize ──▶ RunStore::append
//!                               │
//!                               ▼
//!                            cascade ──▶ dependents (run_with_retry) + Notifier
//! ```

mod cascade;
mod error;
mod executor;
mod retry;
mod runner;
mod scheduler;
mod signal;

pub use error::EngineError;
pub use executor::Executor;
pub use retry::{DEFAULT_RETRY_BACKOFF, retry_trigger};
pub use runner::{CRON_TRIGGER, JobRunner, MANUAL_TRIGGER, dependent_trigger};
pub use scheduler::{EngineState, ScheduleEngine, TICK, TickPlanner};
pub use signal::ShutdownSignal;

//! Attempt bookkeeping shared by the retry loop, the cascade and manual runs.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use cadence_core::{JobRun, JobSpec, OnEvent, Outcome, Schedule};
use cadence_notify::Notifier;
use cadence_runlog::RunStore;
use tracing::warn;

use crate::error::EngineError;
use crate::executor::Executor;
use crate::retry::DEFAULT_RETRY_BACKOFF;

/// Trigger recorded for runs started by the schedule loop.
pub const CRON_TRIGGER: &str = "cron";

/// Trigger recorded for runs started by hand.
pub const MANUAL_TRIGGER: &str = "manual";

/// Trigger recorded for a job started by `parent`'s cascade.
pub fn dependent_trigger(parent: &str) -> String {
    format!("job[{parent}]")
}

/// Executes jobs and everything that follows an attempt.
///
/// Without a schedule attached a job only sees its own event lists and its
/// dependents cannot be resolved.
pub struct JobRunner {
    pub(crate) schedule: Option<Arc<Schedule>>,
    pub(crate) executor: Executor,
    pub(crate) store: Arc<dyn RunStore>,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) retry_backoff: Duration,
}

impl JobRunner {
    pub fn new(executor: Executor, store: Arc<dyn RunStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            schedule: None,
            executor,
            store,
            notifier,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }

    pub fn with_schedule(mut self, schedule: Arc<Schedule>) -> Self {
        self.schedule = Some(schedule);
        self
    }

    /// Pause between a failed attempt and the next one.
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub fn schedule(&self) -> Option<&Arc<Schedule>> {
        self.schedule.as_ref()
    }

    pub fn store(&self) -> &Arc<dyn RunStore> {
        &self.store
    }

    /// Look a job up in the attached schedule.
    pub fn job(&self, name: &str) -> Option<&JobSpec> {
        self.schedule.as_deref()?.job(name)
    }

    /// Actions a run of `job` fires for `outcome`, schedule defaults included.
    pub fn actions_for(&self, job: &JobSpec, outcome: Outcome) -> OnEvent {
        match &self.schedule {
            Some(schedule) => schedule.actions_for(job, outcome),
            None => job.on_event(outcome).clone(),
        }
    }

    /// Record a finished attempt and run its cascade.
    ///
    /// The run is persisted first, then pushed into the job's recent-run
    /// window, then the cascade runs to completion. A persistence failure is
    /// logged and does not change the run.
    pub async fn finalize(&self, job: &JobSpec, run: &mut JobRun) {
        run.triggered = self.actions_for(job, run.outcome()).trigger_job;

        if let Err(e) = self.store.append(run).await {
            warn!(job = %job.name, trigger = %run.triggered_by, error = %e, "Failed to persist run");
        }
        job.record_run(run.clone());

        self.cascade(job, run).await;
    }

    /// Run `name` once by hand: one attempt, no retries, then finalize.
    pub async fn run_manual(&self, name: &str) -> Result<JobRun, EngineError> {
        let job = self
            .job(name)
            .ok_or_else(|| EngineError::JobNotFound(name.to_string()))?;

        let _flight = job.enter_flight();
        let mut run = self
            .executor
            .execute(job, MANUAL_TRIGGER, &BTreeMap::new())
            .await;
        self.finalize(job, &mut run).await;
        Ok(run)
    }
}

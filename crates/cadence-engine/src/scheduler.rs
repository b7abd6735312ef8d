//! The schedule loop.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use cadence_config::EngineConfig;
use cadence_core::{Clock, JobRun, Schedule, SystemClock};
use cadence_notify::Notifier;
use cadence_runlog::RunStore;
use chrono::{DateTime, Local, SubsecRound, TimeDelta, TimeZone, Utc};
use parking_lot::RwLock;
use tokio::time::MissedTickBehavior;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::error::EngineError;
use crate::executor::Executor;
use crate::runner::{CRON_TRIGGER, JobRunner};
use crate::signal::ShutdownSignal;

/// Interval between due-time evaluations.
pub const TICK: Duration = Duration::from_secs(1);

/// Lifecycle of a [`ScheduleEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Loading,
    Validating,
    Running,
    Stopping,
    Stopped,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Loading => "loading",
            Self::Validating => "validating",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Tracks the next fire instant of every cron job.
///
/// Cron expressions are read as wall-clock time in `Tz`, the host's local
/// timezone unless planned with [`TickPlanner::in_zone`].
#[derive(Debug)]
pub struct TickPlanner<Tz: TimeZone = Local> {
    next: HashMap<String, DateTime<Utc>>,
    zone: Tz,
}

impl TickPlanner<Local> {
    /// Plan from `now`. A job whose instant is the current second is due on
    /// the first evaluation.
    pub fn new(schedule: &Schedule, now: DateTime<Utc>) -> Self {
        Self::in_zone(schedule, now, Local)
    }
}

impl<Tz: TimeZone> TickPlanner<Tz> {
    pub fn in_zone(schedule: &Schedule, now: DateTime<Utc>, zone: Tz) -> Self {
        let start = now.trunc_subsecs(0) - TimeDelta::seconds(1);
        let next = schedule
            .jobs
            .iter()
            .filter_map(|(name, job)| Some((name.clone(), job.next_run_in(&start, &zone)?)))
            .collect();
        Self { next, zone }
    }

    /// Jobs due at `now` (second granularity), sorted by name. Each returned
    /// job's next instant moves past `now`, so missed instants fire once.
    pub fn due(&mut self, schedule: &Schedule, now: DateTime<Utc>) -> Vec<String> {
        let now = now.trunc_subsecs(0);
        let zone = &self.zone;
        let mut due = Vec::new();

        self.next.retain(|name, next| {
            if *next > now {
                return true;
            }
            due.push(name.clone());
            match schedule.job(name).and_then(|job| job.next_run_in(&now, zone)) {
                Some(following) => {
                    *next = following;
                    true
                }
                None => false,
            }
        });

        due.sort();
        due
    }

    pub fn next_fire(&self, job: &str) -> Option<DateTime<Utc>> {
        self.next.get(job).copied()
    }
}

/// Owns the validated schedule and drives it.
pub struct ScheduleEngine {
    schedule: Arc<Schedule>,
    runner: Arc<JobRunner>,
    config: EngineConfig,
    state: RwLock<EngineState>,
    tracker: TaskTracker,
    shutdown: ShutdownSignal,
    clock: Arc<dyn Clock>,
    tick: Duration,
}

impl ScheduleEngine {
    /// Validate `schedule` and wire it to `store` and `notifier`.
    pub fn new(
        mut schedule: Schedule,
        store: Arc<dyn RunStore>,
        notifier: Arc<dyn Notifier>,
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        let state = RwLock::new(EngineState::Loading);
        Self::enter(&state, EngineState::Validating);
        schedule.validate()?;

        let schedule = Arc::new(schedule);
        let executor = Executor::new().suppress_output(config.suppress_logs);
        let runner = JobRunner::new(executor, store, notifier)
            .with_schedule(Arc::clone(&schedule))
            .with_retry_backoff(config.retry_backoff());

        info!(jobs = schedule.len(), "Schedule validated");
        Ok(Self {
            schedule,
            runner: Arc::new(runner),
            config,
            state,
            tracker: TaskTracker::new(),
            shutdown: ShutdownSignal::new(),
            clock: Arc::new(SystemClock),
            tick: TICK,
        })
    }

    /// Clock used for due-time evaluation.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    pub fn schedule(&self) -> &Arc<Schedule> {
        &self.schedule
    }

    pub fn runner(&self) -> &Arc<JobRunner> {
        &self.runner
    }

    pub fn state(&self) -> EngineState {
        *self.state.read()
    }

    /// Handle that stops [`ScheduleEngine::run`] when tripped.
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    pub fn stop(&self) {
        self.shutdown.request_shutdown();
    }

    /// Dispatched jobs that have not finished yet.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Seed every job's recent-run window from the run store.
    pub async fn load_history(&self) {
        let capacity = self.config.recent_runs;
        for job in self.schedule.jobs.values() {
            match self.runner.store().read_last(&job.name, capacity).await {
                Ok(runs) => {
                    debug!(job = %job.name, runs = runs.len(), "Loaded run history");
                    job.seed_recent_runs(runs, capacity);
                }
                Err(e) => {
                    warn!(job = %job.name, error = %e, "Failed to load run history");
                    job.seed_recent_runs(Vec::new(), capacity);
                }
            }
        }
    }

    /// Run `name` once by hand.
    pub async fn run_manual(&self, name: &str) -> Result<JobRun, EngineError> {
        self.runner.run_manual(name).await
    }

    /// Evaluate due jobs every tick until stopped.
    ///
    /// Due jobs are spawned and never awaited by the loop. On stop, in-flight
    /// jobs are waited for up to the configured grace period.
    pub async fn run(&self) -> Result<(), EngineError> {
        {
            let mut state = self.state.write();
            if *state != EngineState::Validating {
                return Err(EngineError::InvalidState(state.to_string()));
            }
            *state = EngineState::Running;
        }
        info!(jobs = self.schedule.len(), tick = ?self.tick, "Schedule engine running");

        let mut planner = TickPlanner::new(&self.schedule, self.clock.now());
        let mut interval = tokio::time::interval(self.tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let stop = self.shutdown.wait();
        tokio::pin!(stop);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    for name in planner.due(&self.schedule, self.clock.now()) {
                        self.dispatch(&name);
                    }
                }
                _ = &mut stop => {
                    info!("Stop requested, leaving schedule loop");
                    break;
                }
            }
        }

        Self::enter(&self.state, EngineState::Stopping);
        self.drain().await;
        Self::enter(&self.state, EngineState::Stopped);
        Ok(())
    }

    fn dispatch(&self, name: &str) {
        let Some(job) = self.schedule.job(name) else {
            return;
        };
        if !self.config.allow_overlap && job.in_flight() > 0 {
            info!(job = name, in_flight = job.in_flight(), "Previous run still in flight, skipping");
            return;
        }

        let runner = Arc::clone(&self.runner);
        let name = name.to_string();
        self.tracker.spawn(async move {
            if let Some(job) = runner.job(&name) {
                runner.run_with_retry(job, CRON_TRIGGER, &BTreeMap::new()).await;
            }
        });
    }

    async fn drain(&self) {
        self.tracker.close();
        let pending = self.tracker.len();
        if pending == 0 {
            return;
        }

        let grace = self.config.shutdown_grace();
        if grace.is_zero() {
            info!(pending, "Not waiting for in-flight jobs");
            return;
        }

        info!(pending, grace = ?grace, "Waiting for in-flight jobs");
        if tokio::time::timeout(grace, self.tracker.wait()).await.is_err() {
            warn!(pending = self.tracker.len(), "Jobs still running after grace period");
        }
    }

    fn enter(state: &RwLock<EngineState>, next: EngineState) {
        let mut current = state.write();
        let previous = *current;
        debug!(from = %previous, to = %next, "Engine state change");
        *current = next;
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;

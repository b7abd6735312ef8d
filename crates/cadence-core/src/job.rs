//! Job definitions and their runtime bookkeeping.

use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize, Serializer};

use crate::command::Command;
use crate::cron_expr::CronExpr;
use crate::error::CronError;
use crate::event::{OnEvent, Outcome};
use crate::run::JobRun;

/// Default size of a job's recent-run window.
pub const DEFAULT_RECENT_RUNS: usize = 10;

/// File-safe form of a job name: ASCII letters, digits, `-` and `_` are kept,
/// anything else becomes `_`. Distinct names can map to the same key.
pub fn storage_key(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// A job as declared in the schedule definition.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobSpec {
    /// Taken from the job's key in the schedule.
    #[serde(skip_deserializing)]
    pub name: String,

    /// Five-field cron expression; empty means the job only runs when
    /// triggered by another job or by hand.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cron: String,

    #[serde(default)]
    pub command: Command,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<PathBuf>,

    /// Attempts made after a failed first one.
    #[serde(default)]
    pub retries: u32,

    #[serde(default, skip_serializing_if = "OnEvent::is_empty")]
    pub on_success: OnEvent,

    #[serde(default, skip_serializing_if = "OnEvent::is_empty")]
    pub on_error: OnEvent,

    #[serde(skip)]
    compiled_cron: Option<CronExpr>,

    #[serde(rename = "runs", skip_deserializing)]
    recent: RecentRuns,

    #[serde(skip)]
    in_flight: Arc<AtomicUsize>,
}

impl JobSpec {
    /// A standalone job running `command`.
    pub fn new<I, S>(command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            command: Command::new(command),
            ..Default::default()
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the cron trigger. An invalid expression is kept as written and
    /// reported by [`JobSpec::compile`].
    pub fn with_cron(mut self, expression: impl Into<String>) -> Self {
        self.cron = expression.into();
        self.compiled_cron = CronExpr::parse(&self.cron).ok();
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_working_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    pub fn with_on_success(mut self, actions: OnEvent) -> Self {
        self.on_success = actions;
        self
    }

    pub fn with_on_error(mut self, actions: OnEvent) -> Self {
        self.on_error = actions;
        self
    }

    /// Parse the cron expression, if any.
    pub fn compile(&mut self) -> Result<(), CronError> {
        self.compiled_cron = if self.cron.trim().is_empty() {
            None
        } else {
            Some(CronExpr::parse(&self.cron)?)
        };
        Ok(())
    }

    pub fn cron_schedule(&self) -> Option<&CronExpr> {
        self.compiled_cron.as_ref()
    }

    pub fn is_time_triggered(&self) -> bool {
        self.compiled_cron.is_some()
    }

    /// Next cron instant strictly after `after`, in local time.
    pub fn next_run_after(&self, after: &DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.compiled_cron.as_ref()?.next_after(after)
    }

    /// Next cron instant strictly after `after`, reading the cron in `zone`.
    pub fn next_run_in<Tz: TimeZone>(&self, after: &DateTime<Utc>, zone: &Tz) -> Option<DateTime<Utc>> {
        self.compiled_cron.as_ref()?.next_after_in(after, zone)
    }

    /// Working directory for the process; empty means inherit.
    pub fn working_dir(&self) -> Option<&Path> {
        self.working_directory
            .as_deref()
            .filter(|dir| !dir.as_os_str().is_empty())
    }

    /// The job's own action list for `outcome`.
    pub fn on_event(&self, outcome: Outcome) -> &OnEvent {
        match outcome {
            Outcome::Success => &self.on_success,
            Outcome::Error => &self.on_error,
        }
    }

    /// Declared parameters overlaid with `overrides`.
    pub fn effective_params(&self, overrides: &BTreeMap<String, String>) -> BTreeMap<String, String> {
        let mut params = self.params.clone();
        params.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        params
    }

    pub fn record_run(&self, run: JobRun) {
        self.recent.push(run);
    }

    /// Recent runs, oldest first.
    pub fn recent_runs(&self) -> Vec<JobRun> {
        self.recent.snapshot()
    }

    pub fn last_run(&self) -> Option<JobRun> {
        self.recent.last()
    }

    /// Replace the recent-run window, e.g. with runs read back from the run log.
    pub fn seed_recent_runs(&self, runs: Vec<JobRun>, capacity: usize) {
        self.recent.seed(runs, capacity);
    }

    /// Mark one execution as running until the guard drops.
    pub fn enter_flight(&self) -> InFlightGuard {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        InFlightGuard {
            counter: Arc::clone(&self.in_flight),
        }
    }

    /// Executions currently running.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

/// Decrements the job's in-flight count on drop.
#[derive(Debug)]
pub struct InFlightGuard {
    counter: Arc<AtomicUsize>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Bounded window of a job's most recent finalized runs.
#[derive(Debug)]
pub struct RecentRuns {
    window: RwLock<RunWindow>,
}

#[derive(Debug)]
struct RunWindow {
    capacity: usize,
    runs: VecDeque<JobRun>,
}

impl RunWindow {
    fn trim(&mut self) {
        while self.runs.len() > self.capacity {
            self.runs.pop_front();
        }
    }
}

impl RecentRuns {
    pub fn new(capacity: usize) -> Self {
        Self {
            window: RwLock::new(RunWindow {
                capacity,
                runs: VecDeque::with_capacity(capacity),
            }),
        }
    }

    pub fn push(&self, run: JobRun) {
        let mut window = self.window.write();
        window.runs.push_back(run);
        window.trim();
    }

    pub fn seed(&self, runs: Vec<JobRun>, capacity: usize) {
        let mut window = self.window.write();
        window.capacity = capacity;
        window.runs = runs.into();
        window.trim();
    }

    pub fn snapshot(&self) -> Vec<JobRun> {
        self.window.read().runs.iter().cloned().collect()
    }

    pub fn last(&self) -> Option<JobRun> {
        self.window.read().runs.back().cloned()
    }

    pub fn len(&self) -> usize {
        self.window.read().runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.window.read().capacity
    }
}

impl Default for RecentRuns {
    fn default() -> Self {
        Self::new(DEFAULT_RECENT_RUNS)
    }
}

impl Serialize for RecentRuns {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.window.read().runs.iter())
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;

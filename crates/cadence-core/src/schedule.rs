//! The job registry.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::ScheduleError;
use crate::event::{OnEvent, Outcome};
use crate::job::{JobSpec, storage_key};

/// All job definitions plus schedule-level event defaults.
///
/// Built once at startup and validated before the engine runs; the set of
/// jobs never changes afterwards and the whole registry is shared read-only.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Schedule {
    #[serde(default)]
    pub jobs: BTreeMap<String, JobSpec>,

    /// Applied to every job after its own `on_success`.
    #[serde(default, skip_serializing_if = "OnEvent::is_empty")]
    pub on_success: OnEvent,

    /// Applied to every job after its own `on_error`.
    #[serde(default, skip_serializing_if = "OnEvent::is_empty")]
    pub on_error: OnEvent,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    InProgress,
    Done,
}

impl Schedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_job(mut self, name: impl Into<String>, job: JobSpec) -> Self {
        let name = name.into();
        self.jobs.insert(name.clone(), job.named(name));
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

    /// Check every cron expression and trigger reference, then back-fill
    /// job names from their keys.
    pub fn validate(&mut self) -> Result<(), ScheduleError> {
        for (name, job) in self.jobs.iter_mut() {
            job.compile().map_err(|reason| ScheduleError::InvalidCron {
                job: name.clone(),
                expression: job.cron.clone(),
                reason,
            })?;
        }

        for (name, job) in &self.jobs {
            for outcome in [Outcome::Success, Outcome::Error] {
                self.check_targets(job.on_event(outcome), || format!("job '{name}'"))?;
            }
        }
        for outcome in [Outcome::Success, Outcome::Error] {
            self.check_targets(self.defaults_for(outcome), || {
                format!("schedule-level {}", outcome.event_key())
            })?;
        }

        for (name, job) in self.jobs.iter_mut() {
            job.name.clone_from(name);
        }
        Ok(())
    }

    fn check_targets(
        &self,
        actions: &OnEvent,
        referenced_by: impl Fn() -> String,
    ) -> Result<(), ScheduleError> {
        match actions
            .trigger_job
            .iter()
            .find(|target| !self.jobs.contains_key(target.as_str()))
        {
            Some(target) => Err(ScheduleError::UnknownTriggerJob {
                target: target.clone(),
                referenced_by: referenced_by(),
            }),
            None => Ok(()),
        }
    }

    pub fn job(&self, name: &str) -> Option<&JobSpec> {
        self.jobs.get(name)
    }

    /// Like [`Schedule::job`] but with a typed not-found error.
    pub fn get(&self, name: &str) -> Result<&JobSpec, ScheduleError> {
        self.job(name)
            .ok_or_else(|| ScheduleError::JobNotFound(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn defaults_for(&self, outcome: Outcome) -> &OnEvent {
        match outcome {
            Outcome::Success => &self.on_success,
            Outcome::Error => &self.on_error,
        }
    }

    /// The combined action list a run of `job` fires for `outcome`.
    pub fn actions_for(&self, job: &JobSpec, outcome: Outcome) -> OnEvent {
        OnEvent::merge(job.on_event(outcome), self.defaults_for(outcome))
    }

    /// Jobs with no cron that nothing ever triggers.
    pub fn unreachable_jobs(&self) -> Vec<&str> {
        let referenced: BTreeSet<&str> = self
            .jobs
            .values()
            .flat_map(|job| [&job.on_success, &job.on_error])
            .chain([&self.on_success, &self.on_error])
            .flat_map(|actions| actions.trigger_job.iter().map(String::as_str))
            .collect();

        self.jobs
            .iter()
            .filter(|(name, job)| job.cron.trim().is_empty() && !referenced.contains(name.as_str()))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Groups of jobs whose names share one [`storage_key`], sorted by key.
    pub fn storage_key_collisions(&self) -> Vec<(String, Vec<&str>)> {
        let mut by_key: BTreeMap<String, Vec<&str>> = BTreeMap::new();
        for name in self.jobs.keys() {
            by_key.entry(storage_key(name)).or_default().push(name.as_str());
        }
        by_key.into_iter().filter(|(_, names)| names.len() > 1).collect()
    }

    /// Trigger chains that lead back to where they started, as job name paths
    /// ending with the repeated job.
    pub fn trigger_cycles(&self) -> Vec<Vec<String>> {
        let mut state = HashMap::new();
        let mut stack = Vec::new();
        let mut cycles = Vec::new();

        for name in self.jobs.keys() {
            if !state.contains_key(name.as_str()) {
                self.visit(name, &mut state, &mut stack, &mut cycles);
            }
        }
        cycles
    }

    fn visit<'a>(
        &'a self,
        name: &'a str,
        state: &mut HashMap<&'a str, Visit>,
        stack: &mut Vec<&'a str>,
        cycles: &mut Vec<Vec<String>>,
    ) {
        state.insert(name, Visit::InProgress);
        stack.push(name);

        for next in self.trigger_targets(name) {
            match state.get(next).copied() {
                Some(Visit::InProgress) => {
                    let start = stack.iter().position(|n| *n == next).unwrap_or(0);
                    let mut cycle: Vec<String> =
                        stack[start..].iter().map(|n| n.to_string()).collect();
                    cycle.push(next.to_string());
                    cycles.push(cycle);
                }
                Some(Visit::Done) => {}
                None => self.visit(next, state, stack, cycles),
            }
        }

        stack.pop();
        state.insert(name, Visit::Done);
    }

    fn trigger_targets(&self, name: &str) -> BTreeSet<&str> {
        let Some(job) = self.jobs.get(name) else {
            return BTreeSet::new();
        };
        [&job.on_success, &job.on_error, &self.on_success, &self.on_error]
            .into_iter()
            .flat_map(|actions| actions.trigger_job.iter())
            .filter_map(|target| self.jobs.get_key_value(target.as_str()))
            .map(|(key, _)| key.as_str())
            .collect()
    }
}

#[cfg(test)]
#[path = "schedule_tests.rs"]
mod tests;

//! Record of one execution attempt.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::Outcome;

/// Status of a run that never produced an exit code.
pub const STATUS_NOT_COMPLETED: i32 = -1;

/// One attempt of a job, as stored in the run log and the recent-run window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRun {
    /// Exit status, or [`STATUS_NOT_COMPLETED`].
    pub status: i32,

    /// Combined stdout and stderr.
    #[serde(default)]
    pub log: String,

    pub name: String,

    pub triggered_at: DateTime<Utc>,

    /// Provenance: `cron`, `manual`, `job[parent]`, `cron[retry=1]`, ...
    pub triggered_by: String,

    /// Dependent jobs dispatched by this run's outcome.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub triggered: Vec<String>,

    #[serde(default, with = "nanos", skip_serializing_if = "Duration::is_zero")]
    pub duration: Duration,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, String>,
}

impl JobRun {
    /// A fresh, not yet completed run.
    pub fn new(
        name: impl Into<String>,
        triggered_by: impl Into<String>,
        triggered_at: DateTime<Utc>,
        params: BTreeMap<String, String>,
    ) -> Self {
        Self {
            status: STATUS_NOT_COMPLETED,
            log: String::new(),
            name: name.into(),
            triggered_at,
            triggered_by: triggered_by.into(),
            triggered: Vec::new(),
            duration: Duration::ZERO,
            params,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.status == 0
    }

    /// Whether the process ran to an exit code.
    pub fn completed(&self) -> bool {
        self.status != STATUS_NOT_COMPLETED
    }

    pub fn outcome(&self) -> Outcome {
        Outcome::from_status(self.status)
    }
}

/// Durations travel as integer nanoseconds.
mod nanos {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let nanos = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        serializer.serialize_u64(nanos)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_nanos(u64::deserialize(deserializer)?))
    }
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;

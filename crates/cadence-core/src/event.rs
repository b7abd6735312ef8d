//! Follow-on actions fired after a run completes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Dependent jobs and webhooks for one outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OnEvent {
    /// Jobs to run after this outcome.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trigger_job: Vec<String>,

    /// Generic webhooks receiving the run as JSON.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notify_webhook: Vec<String>,

    /// Slack-style webhooks receiving a one-line summary.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notify_slack_webhook: Vec<String>,
}

impl OnEvent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(mut self, job: impl Into<String>) -> Self {
        self.trigger_job.push(job.into());
        self
    }

    pub fn webhook(mut self, url: impl Into<String>) -> Self {
        self.notify_webhook.push(url.into());
        self
    }

    pub fn slack_webhook(mut self, url: impl Into<String>) -> Self {
        self.notify_slack_webhook.push(url.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.trigger_job.is_empty()
            && self.notify_webhook.is_empty()
            && self.notify_slack_webhook.is_empty()
    }

    /// Combine a job's own actions with schedule-level defaults.
    ///
    /// Local entries come first, defaults are appended. Duplicates are kept,
    /// so a target named in both places fires twice.
    pub fn merge(local: &OnEvent, defaults: &OnEvent) -> OnEvent {
        fn chain(a: &[String], b: &[String]) -> Vec<String> {
            a.iter().chain(b).cloned().collect()
        }

        OnEvent {
            trigger_job: chain(&local.trigger_job, &defaults.trigger_job),
            notify_webhook: chain(&local.notify_webhook, &defaults.notify_webhook),
            notify_slack_webhook: chain(
                &local.notify_slack_webhook,
                &defaults.notify_slack_webhook,
            ),
        }
    }
}

/// Which event list a finished run selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Error,
}

impl Outcome {
    pub fn from_status(status: i32) -> Self {
        if status == 0 { Self::Success } else { Self::Error }
    }

    /// Name of the definition key holding this outcome's actions.
    pub fn event_key(&self) -> &'static str {
        match self {
            Self::Success => "on_success",
            Self::Error => "on_error",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.event_key())
    }
}

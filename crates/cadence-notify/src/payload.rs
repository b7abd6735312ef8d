//! Webhook payloads.

use std::fmt;

use cadence_core::JobRun;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::NotifyError;

/// Shape of the body posted to a webhook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    /// The run record as JSON.
    Generic,
    /// `{"text": "..."}` summary for chat webhooks.
    Slack,
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generic => write!(f, "webhook"),
            Self::Slack => write!(f, "slack"),
        }
    }
}

/// Chat webhook message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlackPayload {
    pub text: String,
}

impl SlackPayload {
    pub fn for_run(run: &JobRun) -> Self {
        Self {
            text: format!(
                "{} finished with status {}, triggered by {}",
                run.name, run.status, run.triggered_by
            ),
        }
    }
}

/// Build the JSON body for `run`.
pub fn build_payload(run: &JobRun, kind: PayloadKind) -> Result<Value, NotifyError> {
    let value = match kind {
        PayloadKind::Generic => serde_json::to_value(run)?,
        PayloadKind::Slack => serde_json::to_value(SlackPayload::for_run(run))?,
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn failed_run() -> JobRun {
        let mut run = JobRun::new("backup", "cron[retry=2]", chrono::Utc::now(), BTreeMap::new());
        run.status = 3;
        run.log = "disk full\n".to_string();
        run
    }

    #[test]
    fn test_slack_text() {
        let payload = SlackPayload::for_run(&failed_run());
        assert_eq!(
            payload.text,
            "backup finished with status 3, triggered by cron[retry=2]"
        );
    }

    #[test]
    fn test_slack_payload_only_has_text() {
        let value = build_payload(&failed_run(), PayloadKind::Slack).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), 1);
        assert!(object["text"].as_str().unwrap().starts_with("backup finished"));
    }

    #[test]
    fn test_generic_payload_is_run_record() {
        let run = failed_run();
        let value = build_payload(&run, PayloadKind::Generic).unwrap();
        assert_eq!(value["name"], "backup");
        assert_eq!(value["status"], 3);
        assert_eq!(value["log"], "disk full\n");
        let back: JobRun = serde_json::from_value(value).unwrap();
        assert_eq!(back, run);
    }
}

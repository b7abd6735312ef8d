//! Event cascade: dependent jobs and webhooks after a run.

use std::collections::BTreeMap;

use cadence_core::{JobRun, JobSpec};
use cadence_notify::PayloadKind;
use futures::future::{BoxFuture, join_all};
use tracing::{debug, warn};

use crate::runner::{JobRunner, dependent_trigger};

impl JobRunner {
    /// Fire every action for `run`'s outcome and wait for all of them.
    ///
    /// Dependents run through the full retry policy with trigger
    /// `job[<parent>]` and no params; webhooks get one delivery each. All of
    /// it runs concurrently. Failures are logged and never stop the others.
    pub async fn cascade(&self, job: &JobSpec, run: &JobRun) {
        let outcome = run.outcome();
        let actions = self.actions_for(job, outcome);
        if actions.is_empty() {
            return;
        }

        let trigger = dependent_trigger(&job.name);
        let no_params = BTreeMap::new();
        let mut work: Vec<BoxFuture<'_, ()>> = Vec::new();

        for name in &actions.trigger_job {
            let Some(dependent) = self.job(name) else {
                warn!(job = %job.name, on_event = %outcome, dependent = %name, "Cannot resolve dependent job, skipping");
                continue;
            };
            debug!(job = %job.name, on_event = %outcome, dependent = %name, "Triggering dependent job");

            let trigger = trigger.as_str();
            let params = &no_params;
            work.push(Box::pin(async move {
                self.run_with_retry(dependent, trigger, params).await;
            }));
        }

        let webhooks = actions
            .notify_webhook
            .iter()
            .map(|url| (url, PayloadKind::Generic))
            .chain(
                actions
                    .notify_slack_webhook
                    .iter()
                    .map(|url| (url, PayloadKind::Slack)),
            );
        for (url, kind) in webhooks {
            work.push(Box::pin(async move {
                match self.notifier.notify(run, url, kind).await {
                    Ok(body) => {
                        debug!(job = %job.name, on_event = %outcome, webhook_url = %url, kind = %kind, response = %body, "Webhook response");
                    }
                    Err(e) => {
                        warn!(job = %job.name, on_event = %outcome, webhook_url = %url, kind = %kind, error = %e, "Webhook delivery failed");
                    }
                }
            }));
        }

        join_all(work).await;
    }
}

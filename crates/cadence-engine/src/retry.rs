//! Retry policy.

use std::collections::BTreeMap;
use std::time::Duration;

use cadence_core::{JobRun, JobSpec};
use futures::future::BoxFuture;
use tracing::debug;

use crate::runner::JobRunner;

/// Backoff between attempts when none is configured.
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(5);

/// Trigger descriptor for attempt `attempt` (0 is the first attempt).
pub fn retry_trigger(trigger: &str, attempt: u32) -> String {
    if attempt == 0 {
        trigger.to_string()
    } else {
        format!("{trigger}[retry={attempt}]")
    }
}

impl JobRunner {
    /// Run `job` up to `retries + 1` times, finalizing every attempt.
    ///
    /// Stops at the first success. Between a failure and the next attempt the
    /// runner sleeps for its fixed backoff. Returns the last attempt.
    ///
    /// Boxed because the cascade of each attempt can start dependents through
    /// this same method.
    pub fn run_with_retry<'a>(
        &'a self,
        job: &'a JobSpec,
        trigger: &'a str,
        params: &'a BTreeMap<String, String>,
    ) -> BoxFuture<'a, JobRun> {
        Box::pin(async move {
            let _flight = job.enter_flight();
            let attempts = job.retries.saturating_add(1);
            let mut attempt = 0;

            loop {
                let descriptor = retry_trigger(trigger, attempt);
                let mut run = self.executor.execute(job, &descriptor, params).await;
                self.finalize(job, &mut run).await;

                attempt += 1;
                if run.succeeded() || attempt >= attempts {
                    return run;
                }

                debug!(
                    job = %job.name,
                    trigger = %descriptor,
                    backoff = ?self.retry_backoff,
                    "Attempt failed, retrying"
                );
                tokio::time::sleep(self.retry_backoff).await;
            }
        })
    }
}

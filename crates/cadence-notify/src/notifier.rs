//! Webhook delivery.

use std::time::Duration;

use async_trait::async_trait;
use cadence_core::JobRun;
use reqwest::Client;
use tracing::debug;

use crate::error::NotifyError;
use crate::payload::{PayloadKind, build_payload};

/// Request timeout when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Delivers a finished run to a URL.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// POST `run` to `url`, returning the response body.
    async fn notify(&self, run: &JobRun, url: &str, kind: PayloadKind) -> Result<String, NotifyError>;
}

/// [`Notifier`] over HTTP.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: Client,
}

impl WebhookNotifier {
    pub fn new(timeout: Duration) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("cadence/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| NotifyError::Client(e.to_string()))?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, run: &JobRun, url: &str, kind: PayloadKind) -> Result<String, NotifyError> {
        let payload = build_payload(run, kind)?;

        let response = self.client.post(url).json(&payload).send().await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(NotifyError::Status {
                status: status.as_u16(),
                body,
            });
        }

        debug!(job = %run.name, webhook_url = url, kind = %kind, "Webhook delivered");
        Ok(body)
    }
}

#[cfg(test)]
#[path = "notifier_tests.rs"]
mod tests;

//! Run store trait.

use async_trait::async_trait;
use cadence_core::JobRun;

use crate::error::RunLogError;

/// Where finalized runs are recorded.
#[async_trait]
pub trait RunStore: Send + Sync {
    /// Append one finalized run to its job's history.
    async fn append(&self, run: &JobRun) -> Result<(), RunLogError>;

    /// The `n` most recent runs of `job`, oldest first.
    async fn read_last(&self, job: &str, n: usize) -> Result<Vec<JobRun>, RunLogError>;
}

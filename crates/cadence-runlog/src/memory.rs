//! In-memory run store.

use std::collections::HashMap;

use async_trait::async_trait;
use cadence_core::JobRun;
use tokio::sync::RwLock;

use crate::error::RunLogError;
use crate::store::RunStore;

/// Keeps every run in memory. Used when no home directory is wanted and in tests.
#[derive(Debug, Default)]
pub struct MemoryRunStore {
    runs: RwLock<HashMap<String, Vec<JobRun>>>,
}

impl MemoryRunStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every recorded run of `job`, oldest first.
    pub async fn all(&self, job: &str) -> Vec<JobRun> {
        self.runs.read().await.get(job).cloned().unwrap_or_default()
    }

    /// Total runs across all jobs.
    pub async fn len(&self) -> usize {
        self.runs.read().await.values().map(Vec::len).sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl RunStore for MemoryRunStore {
    async fn append(&self, run: &JobRun) -> Result<(), RunLogError> {
        let mut runs = self.runs.write().await;
        runs.entry(run.name.clone()).or_default().push(run.clone());
        Ok(())
    }

    async fn read_last(&self, job: &str, n: usize) -> Result<Vec<JobRun>, RunLogError> {
        let runs = self.runs.read().await;
        let Some(history) = runs.get(job) else {
            return Ok(Vec::new());
        };
        let skip = history.len().saturating_sub(n);
        Ok(history[skip..].to_vec())
    }
}

//! File-backed run log.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use cadence_core::{JobRun, storage_key};
use dashmap::DashMap;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::RunLogError;
use crate::store::RunStore;
use crate::tail;

const FILE_SUFFIX: &str = ".job.jsonl";

/// One newline-delimited JSON file per job under a home directory.
///
/// Files are only ever appended to. Writers for the same job serialize on a
/// per-job lock and each record goes out in a single write on a file opened
/// in append mode.
pub struct FileRunLog {
    dir: PathBuf,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl FileRunLog {
    /// Open the run log in `dir`, creating the directory if needed.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, RunLogError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| RunLogError::io(&dir, e))?;

        debug!("FileRunLog initialized at {:?}", dir);
        Ok(Self {
            dir,
            locks: DashMap::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Log file for `job`.
    pub fn path_for(&self, job: &str) -> PathBuf {
        self.dir.join(format!("{}{}", storage_key(job), FILE_SUFFIX))
    }

    fn lock_for(&self, job: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(storage_key(job))
            .or_default()
            .value()
            .clone()
    }
}

#[async_trait]
impl RunStore for FileRunLog {
    async fn append(&self, run: &JobRun) -> Result<(), RunLogError> {
        let mut record = serde_json::to_vec(run)?;
        record.push(b'\n');

        let path = self.path_for(&run.name);
        let lock = self.lock_for(&run.name);
        let _guard = lock.lock().await;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| RunLogError::io(&path, e))?;
        file.write_all(&record)
            .await
            .map_err(|e| RunLogError::io(&path, e))?;
        file.flush().await.map_err(|e| RunLogError::io(&path, e))?;

        debug!(job = %run.name, "Appended run to {:?}", path);
        Ok(())
    }

    /// Names that share a file are told apart by each record's `name`.
    async fn read_last(&self, job: &str, n: usize) -> Result<Vec<JobRun>, RunLogError> {
        let path = self.path_for(job);
        let reader_path = path.clone();
        let job = job.to_string();

        let result = tokio::task::spawn_blocking(move || {
            tail::read_last(&reader_path, n, |line| {
                match serde_json::from_slice::<JobRun>(line) {
                    Ok(run) if run.name == job => Some(run),
                    Ok(_) => None,
                    Err(e) => {
                        debug!(path = ?reader_path, error = %e, "Skipping undecodable run log line");
                        None
                    }
                }
            })
        })
        .await
        .map_err(|e| RunLogError::Reader(e.to_string()))?;

        match result {
            Ok(runs) => Ok(runs),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(RunLogError::io(path, e)),
        }
    }
}

#[cfg(test)]
#[path = "file_tests.rs"]
mod tests;

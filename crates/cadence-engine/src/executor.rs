//! Single-attempt job execution.

use std::collections::BTreeMap;
use std::io;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Instant;

use cadence_core::{Clock, JobRun, JobSpec, STATUS_NOT_COMPLETED, SystemClock, template};
use parking_lot::Mutex;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::{debug, info, warn};

const READ_BUFFER: usize = 4096;

#[derive(Debug, Error)]
enum StartError {
    #[error("no command specified")]
    NoCommand,

    #[error("{0}")]
    Spawn(#[from] io::Error),
}

/// Runs one attempt of a job as a child process.
#[derive(Debug, Clone)]
pub struct Executor {
    suppress_output: bool,
    clock: Arc<dyn Clock>,
}

impl Executor {
    pub fn new() -> Self {
        Self {
            suppress_output: false,
            clock: Arc::new(SystemClock),
        }
    }

    /// Keep job output off the scheduler's stdout. It is still captured.
    pub fn suppress_output(mut self, suppress: bool) -> Self {
        self.suppress_output = suppress;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Run `job` once and return the completed run.
    ///
    /// Arguments after the executable are rendered against the job's params
    /// overlaid with `params`. The child inherits the scheduler's environment
    /// plus the job's `env`, and its stdout and stderr land in one buffer.
    /// Failing to start is recorded in the run, never returned as an error.
    pub async fn execute(
        &self,
        job: &JobSpec,
        trigger: &str,
        params: &BTreeMap<String, String>,
    ) -> JobRun {
        let started = Instant::now();
        let mut run = JobRun::new(&job.name, trigger, self.clock.now(), job.effective_params(params));
        info!(job = %job.name, trigger, "Job triggered");

        match self.spawn_and_wait(job, &run.params).await {
            Ok((status, log)) => {
                run.status = status;
                run.log = log;
            }
            Err(e) => {
                run.log = format!("job unable to start: {e}");
                warn!(job = %job.name, trigger, error = %e, "Job unable to start");
                if !self.suppress_output {
                    println!("{}", run.log);
                }
            }
        }
        run.duration = started.elapsed();

        if run.completed() && !run.succeeded() {
            warn!(job = %job.name, trigger, exitcode = run.status, "Job exited with non-zero status");
        } else {
            debug!(job = %job.name, trigger, exitcode = run.status, duration = ?run.duration, "Job finished");
        }
        run
    }

    async fn spawn_and_wait(
        &self,
        job: &JobSpec,
        params: &BTreeMap<String, String>,
    ) -> Result<(i32, String), StartError> {
        let program = job.command.program().ok_or(StartError::NoCommand)?;
        let args: Vec<String> = job
            .command
            .args()
            .iter()
            .map(|arg| template::render_or_literal(arg, params))
            .collect();

        let mut cmd = Command::new(program);
        cmd.args(&args)
            .envs(&job.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = job.working_dir() {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn()?;

        let captured = Mutex::new(Vec::new());
        let mirror = !self.suppress_output;
        let (_, _, exit) = tokio::join!(
            pump(child.stdout.take(), &captured, mirror),
            pump(child.stderr.take(), &captured, mirror),
            child.wait(),
        );

        let status = match exit {
            // no code means the child was killed by a signal
            Ok(exit) => exit.code().unwrap_or(STATUS_NOT_COMPLETED),
            Err(e) => {
                warn!(job = %job.name, error = %e, "Failed waiting for job process");
                STATUS_NOT_COMPLETED
            }
        };

        let log = String::from_utf8_lossy(&captured.into_inner()).into_owned();
        Ok((status, log))
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}

/// Copy everything from `reader` into `sink`, echoing to stdout when `mirror`.
async fn pump<R>(reader: Option<R>, sink: &Mutex<Vec<u8>>, mirror: bool)
where
    R: AsyncRead + Unpin,
{
    let Some(mut reader) = reader else {
        return;
    };
    let mut stdout = tokio::io::stdout();
    let mut buf = [0u8; READ_BUFFER];

    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                sink.lock().extend_from_slice(&buf[..n]);
                if mirror && stdout.write_all(&buf[..n]).await.is_err() {
                    debug!("Could not mirror job output");
                }
            }
            Err(e) => {
                debug!(error = %e, "Job output stream closed");
                break;
            }
        }
    }

    if mirror {
        let _ = stdout.flush().await;
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;

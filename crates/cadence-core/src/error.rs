//! Error types for schedule definitions.

use thiserror::Error;

/// Errors raised while validating or querying a [`Schedule`](crate::Schedule).
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("cron string for job '{job}' is not valid ({expression}): {reason}")]
    InvalidCron {
        job: String,
        expression: String,
        reason: CronError,
    },

    #[error("cannot find spec of job '{target}' that is referenced in {referenced_by}")]
    UnknownTriggerJob {
        target: String,
        referenced_by: String,
    },

    #[error("Job not found: {0}")]
    JobNotFound(String),
}

/// Errors from parsing a 5-field cron expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CronError {
    #[error("empty expression")]
    Empty,

    #[error("expected 5 fields, found {0}")]
    FieldCount(usize),

    #[error("{0}")]
    Parse(String),
}

/// Errors from rendering an argument template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("unclosed action at byte {0}")]
    Unclosed(usize),

    #[error("unsupported action '{0}'")]
    InvalidAction(String),

    #[error("no value for parameter '{0}'")]
    MissingParam(String),
}

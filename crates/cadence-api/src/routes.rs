//! HTTP route definitions.
//!
//! ```text
//! GET /healthz       - Liveness plus job count
//! GET /schedule      - The whole schedule with recent runs
//! GET /jobs          - One summary per job
//! GET /jobs/{name}   - One job's summary and recent runs
//! ```

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use cadence_core::{JobRun, JobSpec};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::state::ApiState;

type ErrorResponse = (StatusCode, Json<Value>);

/// Response for `GET /healthz`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub jobs: usize,
    pub status: &'static str,
    pub version: &'static str,
}

/// One job as listed by `GET /jobs`.
#[derive(Debug, Serialize)]
pub struct JobSummary {
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub cron: String,
    pub command: Vec<String>,
    pub retries: u32,
    pub in_flight: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_run: Option<DateTime<Utc>>,
}

impl JobSummary {
    fn from_job(job: &JobSpec, now: DateTime<Utc>) -> Self {
        Self {
            name: job.name.clone(),
            cron: job.cron.clone(),
            command: job.command.as_slice().to_vec(),
            retries: job.retries,
            in_flight: job.in_flight(),
            next_run: job.next_run_after(&now),
        }
    }
}

/// Response for `GET /jobs`.
#[derive(Debug, Serialize)]
pub struct JobListResponse {
    pub count: usize,
    pub jobs: Vec<JobSummary>,
}

/// Response for `GET /jobs/{name}`.
#[derive(Debug, Serialize)]
pub struct JobDetail {
    #[serde(flatten)]
    pub job: JobSummary,
    pub runs: Vec<JobRun>,
}

/// Build the inspection router over `state`.
pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/healthz", get(health))
        .route("/schedule", get(schedule))
        .route("/jobs", get(list_jobs))
        .route("/jobs/{name}", get(get_job))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        jobs: state.schedule.len(),
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn schedule(State(state): State<ApiState>) -> Result<Json<Value>, ErrorResponse> {
    serde_json::to_value(&*state.schedule).map(Json).map_err(|e| {
        error!(error = %e, "Failed to serialize schedule");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": e.to_string()})),
        )
    })
}

async fn list_jobs(State(state): State<ApiState>) -> Json<JobListResponse> {
    let now = state.clock.now();
    let jobs: Vec<JobSummary> = state
        .schedule
        .jobs
        .values()
        .map(|job| JobSummary::from_job(job, now))
        .collect();

    Json(JobListResponse {
        count: jobs.len(),
        jobs,
    })
}

async fn get_job(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> Result<Json<JobDetail>, ErrorResponse> {
    let Some(job) = state.schedule.job(&name) else {
        return Err((
            StatusCode::NOT_FOUND,
            Json(json!({"error": format!("Job '{name}' not found")})),
        ));
    };

    Ok(Json(JobDetail {
        job: JobSummary::from_job(job, state.clock.now()),
        runs: job.recent_runs(),
    }))
}

#[cfg(test)]
#[path = "routes_tests.rs"]
mod tests;

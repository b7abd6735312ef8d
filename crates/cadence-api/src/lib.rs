//! # Cadence API
//!
//! A read-only view of a running schedule over HTTP. Handlers only read the
//! shared [`Schedule`](cadence_core::Schedule); nothing here can start, stop
//! or change a job.

mod error;
mod routes;
mod server;
mod state;

pub use error::ApiError;
pub use routes::{HealthResponse, JobDetail, JobListResponse, JobSummary, create_router};
pub use server::ApiServer;
pub use state::ApiState;

//! Shared handler state.

use std::sync::Arc;

use cadence_core::{Clock, Schedule, SystemClock};

/// What every handler can see.
#[derive(Clone)]
pub struct ApiState {
    pub schedule: Arc<Schedule>,
    /// Used to compute each job's next fire time.
    pub clock: Arc<dyn Clock>,
}

impl ApiState {
    pub fn new(schedule: Arc<Schedule>) -> Self {
        Self {
            schedule,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

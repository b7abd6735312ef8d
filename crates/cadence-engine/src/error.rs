//! Engine errors.

use cadence_core::ScheduleError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Invalid schedule: {0}")]
    Schedule(ScheduleError),

    #[error("Engine cannot start from state {0}")]
    InvalidState(String),

    #[error("Signal setup failed: {0}")]
    SignalSetup(String),
}

impl From<ScheduleError> for EngineError {
    fn from(err: ScheduleError) -> Self {
        match err {
            ScheduleError::JobNotFound(name) => Self::JobNotFound(name),
            other => Self::Schedule(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_typed_variant() {
        let err = EngineError::from(ScheduleError::JobNotFound("ghost".to_string()));
        assert!(matches!(err, EngineError::JobNotFound(ref name) if name == "ghost"));
    }

    #[test]
    fn test_definition_error_wrapped() {
        let err = EngineError::from(ScheduleError::UnknownTriggerJob {
            target: "b".to_string(),
            referenced_by: "job 'a'".to_string(),
        });
        assert!(matches!(err, EngineError::Schedule(_)));
        assert!(err.to_string().contains("job 'a'"));
    }
}

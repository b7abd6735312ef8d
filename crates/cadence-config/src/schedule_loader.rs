//! Schedule definition loader.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use cadence_core::Schedule;

use crate::error::ConfigError;

/// Parses and validates YAML schedule definitions.
pub struct ScheduleLoader;

impl ScheduleLoader {
    /// Load and validate the schedule at `path`.
    pub fn load(path: &Path) -> Result<Schedule, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ConfigError::NotFound(path.display().to_string()),
            _ => ConfigError::Io(e),
        })?;
        Self::load_str(&content)
    }

    /// Parse and validate a schedule definition.
    pub fn load_str(content: &str) -> Result<Schedule, ConfigError> {
        let mut schedule = Self::parse(content)?;
        schedule.validate()?;
        Ok(schedule)
    }

    /// Parse without validating.
    pub fn parse(content: &str) -> Result<Schedule, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Schedule::default());
        }
        Ok(serde_yml::from_str(content)?)
    }
}

#[cfg(test)]
#[path = "schedule_loader_tests.rs"]
mod tests;

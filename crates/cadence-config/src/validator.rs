//! Settings and schedule validation.

use cadence_core::{Outcome, Schedule};

use crate::error::ConfigError;
use crate::schema::Settings;

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// The first error as a [`ConfigError`], if any.
    pub fn into_result(self) -> Result<Vec<ValidationWarning>, ConfigError> {
        match self.errors.into_iter().next() {
            Some(error) => Err(ConfigError::InvalidValue {
                field: error.path,
                message: error.message,
            }),
            None => Ok(self.warnings),
        }
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Settings and schedule validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the settings.
    pub fn validate(settings: &Settings) -> Result<ValidationResult, ConfigError> {
        let mut result = ValidationResult::default();

        Self::validate_engine(settings, &mut result);
        Self::validate_server(settings, &mut result);
        Self::validate_notify(settings, &mut result);
        Self::validate_log(settings, &mut result);

        Ok(result)
    }

    fn validate_engine(settings: &Settings, result: &mut ValidationResult) {
        let engine = &settings.engine;

        if engine.recent_runs == 0 {
            result.add_error(ValidationError::new(
                "engine.recent_runs",
                "recent_runs must be greater than 0",
            ));
        }

        if engine.recent_runs > 1000 {
            result.add_warning(ValidationWarning::new(
                "engine.recent_runs",
                "recent_runs is very high (>1000), every job keeps this many runs in memory",
            ));
        }

        if engine.retry_backoff_secs > 3600 {
            result.add_warning(ValidationWarning::new(
                "engine.retry_backoff_secs",
                "retry backoff is longer than an hour",
            ));
        }
    }

    fn validate_server(settings: &Settings, result: &mut ValidationResult) {
        if !settings.server.enabled {
            return;
        }

        if settings.server.port == 0 {
            result.add_error(ValidationError::new("server.port", "Port cannot be 0"));
        }

        if settings.server.host.is_empty() {
            result.add_error(ValidationError::new("server.host", "Host cannot be empty"));
        }
    }

    fn validate_notify(settings: &Settings, result: &mut ValidationResult) {
        if settings.notify.timeout_secs == 0 {
            result.add_error(ValidationError::new(
                "notify.timeout_secs",
                "timeout_secs must be greater than 0",
            ));
        }
    }

    fn validate_log(settings: &Settings, result: &mut ValidationResult) {
        if settings.log.level.trim().is_empty() {
            result.add_warning(ValidationWarning::new(
                "log.level",
                "log level is empty, falling back to info",
            ));
        }
    }

    /// Warnings for a schedule that already passed [`Schedule::validate`].
    pub fn validate_schedule(schedule: &Schedule) -> ValidationResult {
        let mut result = ValidationResult::default();

        if schedule.is_empty() {
            result.add_warning(ValidationWarning::new("jobs", "schedule defines no jobs"));
        }

        for name in schedule.unreachable_jobs() {
            result.add_warning(ValidationWarning::new(
                format!("jobs.{name}"),
                "job has no cron and no other job triggers it, it only runs manually",
            ));
        }

        for cycle in schedule.trigger_cycles() {
            result.add_warning(ValidationWarning::new(
                format!("jobs.{}", cycle.first().map(String::as_str).unwrap_or_default()),
                format!("trigger cycle {} can run forever", cycle.join(" -> ")),
            ));
        }

        for (key, names) in schedule.storage_key_collisions() {
            let quoted: Vec<String> = names.iter().map(|name| format!("'{name}'")).collect();
            result.add_warning(ValidationWarning::new(
                format!("jobs.{}", names[0]),
                format!("jobs {} share the run log file '{key}'", quoted.join(", ")),
            ));
        }

        for (name, job) in &schedule.jobs {
            if job.command.is_empty() {
                result.add_warning(ValidationWarning::new(
                    format!("jobs.{name}.command"),
                    "job has no command and every run will fail to start",
                ));
            }

            for outcome in [Outcome::Success, Outcome::Error] {
                let path = format!("jobs.{name}.{}", outcome.event_key());
                Self::validate_urls(&path, job.on_event(outcome), &mut result);
            }
        }

        for outcome in [Outcome::Success, Outcome::Error] {
            Self::validate_urls(outcome.event_key(), schedule.defaults_for(outcome), &mut result);
        }

        result
    }

    fn validate_urls(path: &str, actions: &cadence_core::OnEvent, result: &mut ValidationResult) {
        let urls = actions
            .notify_webhook
            .iter()
            .chain(&actions.notify_slack_webhook);
        for url in urls {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                result.add_warning(ValidationWarning::new(
                    path,
                    format!("webhook URL '{url}' must start with http:// or https://"),
                ));
            }
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;

//! Configuration errors.

use cadence_core::ScheduleError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Environment variable not set: {0}")]
    EnvVarNotSet(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Schedule parse error: {0}")]
    YamlParse(#[from] serde_yml::Error),

    #[error("Invalid schedule: {0}")]
    Schedule(#[from] ScheduleError),
}

//! # Cadence Config
//!
//! Loads the two inputs of a Cadence process: the TOML settings file and the
//! YAML schedule definition.

mod error;
mod loader;
mod schedule_loader;
mod schema;
mod validator;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schedule_loader::ScheduleLoader;
pub use schema::*;
pub use validator::{ConfigValidator, ValidationError, ValidationResult, ValidationWarning};

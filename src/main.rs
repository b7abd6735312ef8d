//! Cadence - lightweight cron job scheduler
//!
//! Main entry point for the Cadence CLI.

mod cli;
mod commands;

use std::path::Path;

use clap::Parser;
use tracing::{info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use cadence_config::{ConfigLoader, ConfigValidator, LogConfig, StorageConfig};

use crate::cli::{Cli, Commands};

/// Initialize tracing with console output and, when enabled, daily log files
/// under `<home>/logs`.
fn init_tracing(config: &LogConfig, home: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let file_layer = if config.file {
        let log_dir = home.join("logs");
        std::fs::create_dir_all(&log_dir)?;

        let file_appender = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix("cadence")
            .filename_suffix("log")
            .max_log_files(30)
            .build(&log_dir)?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        // The writer flushes on drop, so the guard lives as long as the process.
        static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
            std::sync::OnceLock::new();
        let _ = GUARD.set(guard);

        Some(fmt::layer().with_writer(non_blocking).with_ansi(false))
    } else {
        None
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let json_console = config
        .json
        .then(|| fmt::layer().json().with_writer(std::io::stderr));
    let text_console = (!config.json).then(|| {
        fmt::layer()
            .with_target(true)
            .with_ansi(true)
            .with_writer(std::io::stderr)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_console)
        .with(text_console)
        .with(file_layer)
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .unwrap_or_else(|| StorageConfig::default().resolve_home().join("config.toml"));
    let settings = ConfigLoader::load_or_default(&config_path)?;
    let home = settings.storage.resolve_home();

    init_tracing(&settings.log, &home)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_path.display(),
        home = %home.display(),
        "Starting Cadence"
    );

    for warning in ConfigValidator::validate(&settings)?.into_result()? {
        warn!("Settings: {}", warning);
    }

    match cli.command {
        Commands::Run { schedule, no_server } => {
            commands::run(&schedule, no_server, &settings, &home).await
        }
        Commands::Exec { schedule, job } => {
            let code = commands::exec(&schedule, &job, &settings, &home).await?;
            if code != 0 {
                std::process::exit(code);
            }
            Ok(())
        }
        Commands::Validate { schedule } => commands::validate(&schedule),
        Commands::Runs { job, limit, json } => commands::runs(&job, limit, json, &home).await,
    }
}

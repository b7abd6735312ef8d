//! Subcommand handlers for Cadence.

use std::path::Path;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use cadence_api::{ApiServer, ApiState};
use cadence_config::{ConfigValidator, ScheduleLoader, Settings};
use cadence_core::{STATUS_NOT_COMPLETED, Schedule};
use cadence_engine::{ScheduleEngine, ShutdownSignal};
use cadence_notify::WebhookNotifier;
use cadence_runlog::{FileRunLog, RunStore};

type CommandResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Load, validate and report on a schedule definition.
fn load_schedule(path: &Path) -> CommandResult<Schedule> {
    let schedule = ScheduleLoader::load(path).map_err(|e| {
        error!(schedule = %path.display(), error = %e, "Invalid schedule definition");
        e
    })?;
    for warning in ConfigValidator::validate_schedule(&schedule).warnings {
        warn!("Schedule: {}", warning);
    }
    Ok(schedule)
}

async fn build_engine(path: &Path, settings: &Settings, home: &Path) -> CommandResult<ScheduleEngine> {
    let schedule = load_schedule(path)?;
    let store = Arc::new(FileRunLog::open(home).await?);
    let notifier = Arc::new(WebhookNotifier::new(settings.notify.timeout())?);
    Ok(ScheduleEngine::new(schedule, store, notifier, settings.engine.clone())?)
}

/// Bind the inspection API and serve it until `shutdown` trips.
///
/// Binding happens before returning, so an unusable address fails startup.
/// A server that dies later stops the scheduler too.
async fn start_api(
    settings: &Settings,
    schedule: Arc<Schedule>,
    shutdown: ShutdownSignal,
) -> CommandResult<JoinHandle<()>> {
    let host = &settings.server.host;
    let port = settings.server.port;
    let server = ApiServer::bind(host, port, ApiState::new(schedule))
        .await
        .map_err(|e| {
            error!(addr = %settings.server.addr(), error = %e, "Cannot start inspection API");
            e
        })?;

    Ok(tokio::spawn(async move {
        let stop = shutdown.clone();
        if let Err(e) = server.run_until(async move { stop.wait().await }).await {
            error!(error = %e, "Inspection API failed, stopping");
            shutdown.request_shutdown();
        }
    }))
}

/// Run the schedule until SIGINT or SIGTERM.
pub(crate) async fn run(path: &Path, no_server: bool, settings: &Settings, home: &Path) -> CommandResult {
    let engine = build_engine(path, settings, home).await?;
    let shutdown = engine.shutdown_signal();

    let server = if settings.server.enabled && !no_server {
        Some(start_api(settings, Arc::clone(engine.schedule()), shutdown.clone()).await?)
    } else {
        None
    };

    shutdown.install_os_handlers()?;
    engine.load_history().await;
    let result = engine.run().await;

    if let Some(handle) = server {
        // Stop the API even when the engine failed to start.
        shutdown.request_shutdown();
        if let Err(e) = handle.await {
            warn!(error = %e, "Inspection API task panicked");
        }
    }

    result?;
    info!("Cadence stopped");
    Ok(())
}

/// Run one job once. Returns the process exit code.
pub(crate) async fn exec(path: &Path, job: &str, settings: &Settings, home: &Path) -> CommandResult<i32> {
    let engine = build_engine(path, settings, home).await?;
    engine.load_history().await;

    let run = engine.run_manual(job).await?;
    info!(job, exitcode = run.status, duration = ?run.duration, "Manual run finished");
    Ok(if run.status == STATUS_NOT_COMPLETED { 1 } else { run.status })
}

/// Check a schedule definition.
pub(crate) fn validate(path: &Path) -> CommandResult {
    let schedule = load_schedule(path)?;
    let timed = schedule.jobs.values().filter(|job| job.is_time_triggered()).count();
    println!(
        "{}: {} jobs ({} on a cron schedule)",
        path.display(),
        schedule.len(),
        timed
    );
    Ok(())
}

/// Print the last `limit` runs of `job`.
pub(crate) async fn runs(job: &str, limit: usize, json: bool, home: &Path) -> CommandResult {
    let log = FileRunLog::open(home).await?;
    let runs = log.read_last(job, limit).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&runs)?);
        return Ok(());
    }

    if runs.is_empty() {
        println!("No recorded runs for '{job}'");
        return Ok(());
    }
    for run in &runs {
        println!(
            "{}  status={:<3} trigger={} duration={:?}",
            run.triggered_at.to_rfc3339(),
            run.status,
            run.triggered_by,
            run.duration
        );
    }
    Ok(())
}

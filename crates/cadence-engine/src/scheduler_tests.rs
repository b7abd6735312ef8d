use super::*;
use cadence_core::JobSpec;
use cadence_notify::{DEFAULT_TIMEOUT, WebhookNotifier};
use cadence_runlog::{FileRunLog, MemoryRunStore};
use chrono::{FixedOffset, TimeZone};
use tempfile::TempDir;

fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 6, h, m, s).unwrap()
}

fn validated(mut schedule: Schedule) -> Schedule {
    schedule.validate().unwrap();
    schedule
}

fn notifier() -> Arc<dyn Notifier> {
    Arc::new(WebhookNotifier::new(DEFAULT_TIMEOUT).unwrap())
}

fn quiet_config() -> EngineConfig {
    EngineConfig {
        suppress_logs: true,
        retry_backoff_secs: 0,
        shutdown_grace_secs: 5,
        ..EngineConfig::default()
    }
}

/// Moves forward by `step` on every reading.
#[derive(Debug)]
struct SteppingClock {
    current: parking_lot::Mutex<DateTime<Utc>>,
    step: TimeDelta,
}

impl SteppingClock {
    fn new(start: DateTime<Utc>, step: TimeDelta) -> Self {
        Self {
            current: parking_lot::Mutex::new(start),
            step,
        }
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> DateTime<Utc> {
        let mut current = self.current.lock();
        let now = *current;
        *current = now + self.step;
        now
    }
}

async fn run_for(engine: Arc<ScheduleEngine>, duration: Duration) {
    let handle = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.run().await })
    };
    tokio::time::sleep(duration).await;
    engine.stop();
    handle.await.unwrap().unwrap();
}

#[test]
fn test_planner_waits_for_next_instant() {
    let schedule = validated(Schedule::new().with_job("a", JobSpec::new(["true"]).with_cron("*/5 * * * *")));
    let mut planner = TickPlanner::in_zone(&schedule, at(10, 3, 20), Utc);
    assert_eq!(planner.next_fire("a"), Some(at(10, 5, 0)));

    assert!(planner.due(&schedule, at(10, 4, 59)).is_empty());
    let due = planner.due(&schedule, at(10, 5, 0) + TimeDelta::milliseconds(400));
    assert_eq!(due, vec!["a"]);
    assert_eq!(planner.next_fire("a"), Some(at(10, 10, 0)));
    assert!(planner.due(&schedule, at(10, 5, 1)).is_empty());
}

#[test]
fn test_planner_current_second_is_due() {
    let schedule = validated(Schedule::new().with_job("a", JobSpec::new(["true"]).with_cron("*/5 * * * *")));
    let mut planner = TickPlanner::in_zone(&schedule, at(10, 5, 0) + TimeDelta::milliseconds(500), Utc);
    assert_eq!(planner.due(&schedule, at(10, 5, 0) + TimeDelta::milliseconds(700)), vec!["a"]);
}

#[test]
fn test_planner_missed_instants_fire_once() {
    let schedule = validated(Schedule::new().with_job("a", JobSpec::new(["true"]).with_cron("* * * * *")));
    let mut planner = TickPlanner::in_zone(&schedule, at(10, 0, 30), Utc);
    assert_eq!(planner.due(&schedule, at(10, 7, 10)), vec!["a"]);
    assert_eq!(planner.next_fire("a"), Some(at(10, 8, 0)));
}

#[test]
fn test_planner_fires_at_zone_wall_clock() {
    let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
    let schedule = validated(Schedule::new().with_job("nightly", JobSpec::new(["true"]).with_cron("0 3 * * *")));

    // 20:00 UTC on the 5th is 05:00 on the 6th in Tokyo
    let start = Utc.with_ymd_and_hms(2024, 5, 5, 20, 0, 0).unwrap();
    let mut planner = TickPlanner::in_zone(&schedule, start, tokyo);
    let next = Utc.with_ymd_and_hms(2024, 5, 6, 18, 0, 0).unwrap();
    assert_eq!(planner.next_fire("nightly"), Some(next));

    // 03:00 UTC is noon in Tokyo and must not fire
    let utc_three = Utc.with_ymd_and_hms(2024, 5, 6, 3, 0, 0).unwrap();
    assert!(planner.due(&schedule, utc_three).is_empty());
    assert_eq!(planner.due(&schedule, next), vec!["nightly"]);
}

#[test]
fn test_planner_ignores_jobs_without_cron() {
    let schedule = validated(
        Schedule::new()
            .with_job("timed", JobSpec::new(["true"]).with_cron("* * * * *"))
            .with_job("chained", JobSpec::new(["true"])),
    );
    let mut planner = TickPlanner::in_zone(&schedule, at(10, 0, 30), Utc);
    assert!(planner.next_fire("chained").is_none());
    assert_eq!(planner.due(&schedule, at(11, 0, 0)), vec!["timed"]);
}

#[test]
fn test_invalid_schedule_rejected() {
    let schedule = Schedule::new().with_job("bad", JobSpec::new(["true"]).with_cron("* *"));
    let result = ScheduleEngine::new(
        schedule,
        Arc::new(MemoryRunStore::new()),
        notifier(),
        quiet_config(),
    );
    assert!(matches!(result, Err(EngineError::Schedule(_))));
}

#[tokio::test]
async fn test_run_and_stop_states() {
    let engine = Arc::new(
        ScheduleEngine::new(Schedule::new(), Arc::new(MemoryRunStore::new()), notifier(), quiet_config())
            .unwrap()
            .with_tick(Duration::from_millis(10)),
    );
    assert_eq!(engine.state(), EngineState::Validating);

    let handle = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.run().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(engine.state(), EngineState::Running);

    engine.shutdown_signal().request_shutdown();
    handle.await.unwrap().unwrap();
    assert_eq!(engine.state(), EngineState::Stopped);

    assert!(matches!(engine.run().await, Err(EngineError::InvalidState(_))));
}

#[tokio::test]
async fn test_due_jobs_dispatched_with_cron_trigger() {
    let store = Arc::new(MemoryRunStore::new());
    let schedule = Schedule::new().with_job("tick", JobSpec::new(["true"]).with_cron("* * * * *"));
    let engine = Arc::new(
        ScheduleEngine::new(schedule, store.clone(), notifier(), quiet_config())
            .unwrap()
            .with_tick(Duration::from_millis(20))
            .with_clock(Arc::new(SteppingClock::new(at(9, 0, 0), TimeDelta::seconds(61)))),
    );

    run_for(engine.clone(), Duration::from_millis(200)).await;

    let runs = store.all("tick").await;
    assert!(!runs.is_empty());
    assert!(runs.iter().all(|r| r.triggered_by == "cron" && r.status == 0));
    assert_eq!(engine.in_flight(), 0);
}

#[tokio::test]
async fn test_overlap_disallowed_skips_while_running() {
    let store = Arc::new(MemoryRunStore::new());
    let schedule = Schedule::new().with_job(
        "slow",
        JobSpec::new(["sh", "-c", "sleep 0.5"]).with_cron("* * * * *"),
    );
    let config = EngineConfig {
        allow_overlap: false,
        ..quiet_config()
    };
    let engine = Arc::new(
        ScheduleEngine::new(schedule, store.clone(), notifier(), config)
            .unwrap()
            .with_tick(Duration::from_millis(20))
            .with_clock(Arc::new(SteppingClock::new(at(9, 0, 0), TimeDelta::seconds(61)))),
    );

    run_for(engine, Duration::from_millis(200)).await;
    assert_eq!(store.all("slow").await.len(), 1);
}

#[tokio::test]
async fn test_overlap_allowed_runs_concurrently() {
    let store = Arc::new(MemoryRunStore::new());
    let schedule = Schedule::new().with_job(
        "slow",
        JobSpec::new(["sh", "-c", "sleep 0.5"]).with_cron("* * * * *"),
    );
    let engine = Arc::new(
        ScheduleEngine::new(schedule, store.clone(), notifier(), quiet_config())
            .unwrap()
            .with_tick(Duration::from_millis(20))
            .with_clock(Arc::new(SteppingClock::new(at(9, 0, 0), TimeDelta::seconds(61)))),
    );

    run_for(engine, Duration::from_millis(200)).await;
    assert!(store.all("slow").await.len() > 1);
}

#[tokio::test]
async fn test_load_history_seeds_recent_runs() {
    let temp_dir = TempDir::new().unwrap();
    let log = Arc::new(FileRunLog::open(temp_dir.path()).await.unwrap());
    for status in 0..3 {
        let mut run = JobRun::new("a", "cron", Utc::now(), BTreeMap::new());
        run.status = status;
        log.append(&run).await.unwrap();
    }

    let config = EngineConfig {
        recent_runs: 2,
        ..quiet_config()
    };
    let schedule = Schedule::new()
        .with_job("a", JobSpec::new(["true"]))
        .with_job("b", JobSpec::new(["true"]));
    let engine = ScheduleEngine::new(schedule, log, notifier(), config).unwrap();
    engine.load_history().await;

    let statuses: Vec<i32> = engine.schedule().job("a").unwrap().recent_runs().iter().map(|r| r.status).collect();
    assert_eq!(statuses, vec![1, 2]);
    assert!(engine.schedule().job("b").unwrap().recent_runs().is_empty());
}

#[tokio::test]
async fn test_engine_manual_run() {
    let store = Arc::new(MemoryRunStore::new());
    let schedule = Schedule::new().with_job("a", JobSpec::new(["echo", "hi"]));
    let engine = ScheduleEngine::new(schedule, store.clone(), notifier(), quiet_config()).unwrap();

    let run = engine.run_manual("a").await.unwrap();
    assert_eq!(run.triggered_by, "manual");
    assert_eq!(run.log, "hi\n");
    assert_eq!(store.all("a").await.len(), 1);

    assert!(matches!(engine.run_manual("ghost").await, Err(EngineError::JobNotFound(_))));
}

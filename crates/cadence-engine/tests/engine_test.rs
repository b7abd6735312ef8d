//! End-to-end tests for job execution, retries and the event cascade.
//!
//! Jobs run real child processes through `sh`, runs land in an in-memory or
//! file-backed store and webhooks are served by wiremock.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cadence_core::{JobRun, JobSpec, OnEvent, STATUS_NOT_COMPLETED, Schedule};
use cadence_engine::{CRON_TRIGGER, EngineError, Executor, JobRunner};
use cadence_notify::{DEFAULT_TIMEOUT, NotifyError, Notifier, PayloadKind, WebhookNotifier};
use cadence_runlog::{FileRunLog, MemoryRunStore, RunLogError, RunStore};

// ============================================================================
// Test Helpers
// ============================================================================

/// Records every delivery instead of sending it.
#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<(String, PayloadKind, i32)>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, run: &JobRun, url: &str, kind: PayloadKind) -> Result<String, NotifyError> {
        self.sent.lock().push((url.to_string(), kind, run.status));
        Ok("ok".to_string())
    }
}

/// Refuses every write, like a full or read-only disk.
struct BrokenStore;

#[async_trait]
impl RunStore for BrokenStore {
    async fn append(&self, _run: &JobRun) -> Result<(), RunLogError> {
        Err(RunLogError::Reader("disk full".to_string()))
    }

    async fn read_last(&self, _job: &str, _n: usize) -> Result<Vec<JobRun>, RunLogError> {
        Ok(Vec::new())
    }
}

fn sh(script: &str) -> JobSpec {
    JobSpec::new(["sh", "-c", script])
}

fn runner_with(schedule: Schedule, store: Arc<dyn RunStore>, notifier: Arc<dyn Notifier>) -> JobRunner {
    let mut schedule = schedule;
    schedule.validate().unwrap();
    JobRunner::new(Executor::new().suppress_output(true), store, notifier)
        .with_schedule(Arc::new(schedule))
        .with_retry_backoff(Duration::from_millis(10))
}

fn runner(schedule: Schedule, store: Arc<MemoryRunStore>) -> JobRunner {
    runner_with(schedule, store, Arc::new(RecordingNotifier::default()))
}

async fn run_cron(runner: &JobRunner, name: &str) -> JobRun {
    let job = runner.job(name).unwrap();
    runner.run_with_retry(job, CRON_TRIGGER, &BTreeMap::new()).await
}

fn triggers(runs: &[JobRun]) -> Vec<&str> {
    runs.iter().map(|r| r.triggered_by.as_str()).collect()
}

// ============================================================================
// Retry Tests
// ============================================================================

#[tokio::test]
async fn test_failing_job_runs_retries_plus_one() {
    let store = Arc::new(MemoryRunStore::new());
    let runner = runner(
        Schedule::new().with_job("flaky", JobSpec::new(["false"]).with_retries(2)),
        store.clone(),
    );

    let last = run_cron(&runner, "flaky").await;
    assert_eq!(last.status, 1);
    assert_eq!(last.triggered_by, "cron[retry=2]");

    let runs = store.all("flaky").await;
    assert_eq!(triggers(&runs), vec!["cron", "cron[retry=1]", "cron[retry=2]"]);
    assert!(runs.iter().all(|r| r.status == 1));
    assert_eq!(runner.job("flaky").unwrap().recent_runs().len(), 3);
}

#[tokio::test]
async fn test_first_success_stops_retrying() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(MemoryRunStore::new());
    let job = sh("if [ -f marker ]; then exit 0; fi; touch marker; exit 1")
        .with_retries(5)
        .with_working_directory(temp_dir.path());
    let runner = runner(Schedule::new().with_job("second-time", job), store.clone());

    let last = run_cron(&runner, "second-time").await;
    assert!(last.succeeded());

    let runs = store.all("second-time").await;
    assert_eq!(triggers(&runs), vec!["cron", "cron[retry=1]"]);
    assert_eq!(runs[0].status, 1);
}

#[tokio::test]
async fn test_unstartable_job_records_sentinel() {
    let store = Arc::new(MemoryRunStore::new());
    let runner = runner(
        Schedule::new().with_job("empty", JobSpec::new(Vec::<String>::new()).with_retries(1)),
        store.clone(),
    );

    let last = run_cron(&runner, "empty").await;
    assert_eq!(last.status, STATUS_NOT_COMPLETED);
    assert!(last.log.contains("no command specified"));
    assert_eq!(store.all("empty").await.len(), 2);
}

// ============================================================================
// Parameter Tests
// ============================================================================

#[tokio::test]
async fn test_params_rendered_and_recorded() {
    let store = Arc::new(MemoryRunStore::new());
    let job = JobSpec::new(["echo", "hello {{.who}} from {{ .place }}"])
        .with_param("who", "world")
        .with_param("place", "home");
    let runner = runner(Schedule::new().with_job("greet", job), store.clone());

    let overrides = BTreeMap::from([("who".to_string(), "cadence".to_string())]);
    let run = runner
        .run_with_retry(runner.job("greet").unwrap(), "manual", &overrides)
        .await;

    assert_eq!(run.log, "hello cadence from home\n");
    assert_eq!(run.params.get("who").map(String::as_str), Some("cadence"));
    assert_eq!(run.params.get("place").map(String::as_str), Some("home"));
}

// ============================================================================
// Cascade Tests
// ============================================================================

#[tokio::test]
async fn test_cascade_waits_for_every_action() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/done"))
        .respond_with(ResponseTemplate::new(200).set_body_string("thanks"))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryRunStore::new());
    let schedule = Schedule::new()
        .with_job(
            "a",
            JobSpec::new(["true"]).with_on_success(
                OnEvent::new()
                    .trigger("slow")
                    .trigger("fast")
                    .webhook(format!("{}/done", server.uri())),
            ),
        )
        .with_job("slow", sh("sleep 0.5; echo slow"))
        .with_job("fast", JobSpec::new(["echo", "fast"]));
    let notifier = Arc::new(WebhookNotifier::new(DEFAULT_TIMEOUT).unwrap());
    let runner = runner_with(schedule, store.clone(), notifier);

    let started = Instant::now();
    let run = run_cron(&runner, "a").await;
    assert!(started.elapsed() >= Duration::from_millis(500));

    assert!(run.succeeded());
    assert_eq!(run.triggered, vec!["slow", "fast"]);
    for dependent in ["slow", "fast"] {
        let runs = store.all(dependent).await;
        assert_eq!(runs.len(), 1, "{dependent} should have run once");
        assert_eq!(runs[0].triggered_by, "job[a]");
        assert!(runs[0].params.is_empty());
    }

    let persisted = store.all("a").await;
    assert_eq!(persisted[0].triggered, vec!["slow", "fast"]);
    server.verify().await;
}

#[tokio::test]
async fn test_dependent_failure_does_not_change_parent() {
    let store = Arc::new(MemoryRunStore::new());
    let schedule = Schedule::new()
        .with_job("parent", JobSpec::new(["true"]).with_on_success(OnEvent::new().trigger("child")))
        .with_job("child", JobSpec::new(["false"]).with_retries(1));
    let runner = runner(schedule, store.clone());

    let run = run_cron(&runner, "parent").await;
    assert!(run.succeeded());
    assert_eq!(
        triggers(&store.all("child").await),
        vec!["job[parent]", "job[parent][retry=1]"]
    );
}

#[tokio::test]
async fn test_dependents_chain_transitively() {
    let store = Arc::new(MemoryRunStore::new());
    let schedule = Schedule::new()
        .with_job("a", JobSpec::new(["true"]).with_on_success(OnEvent::new().trigger("b")))
        .with_job("b", JobSpec::new(["false"]).with_on_error(OnEvent::new().trigger("c")))
        .with_job("c", JobSpec::new(["echo", "cleanup"]));
    let runner = runner(schedule, store.clone());

    run_cron(&runner, "a").await;
    let c_runs = store.all("c").await;
    assert_eq!(triggers(&c_runs), vec!["job[b]"]);
    assert_eq!(c_runs[0].log, "cleanup\n");
}

#[tokio::test]
async fn test_schedule_level_on_error_slack() {
    let notifier = Arc::new(RecordingNotifier::default());
    let store = Arc::new(MemoryRunStore::new());
    let schedule = Schedule::new()
        .with_job("broken", JobSpec::new(["false"]))
        .with_job(
            "local",
            JobSpec::new(["false"]).with_on_error(OnEvent::new().webhook("http://hooks.local/broken")),
        )
        .with_on_error(OnEvent::new().slack_webhook("http://hooks.local/slack"));
    let runner = runner_with(schedule, store, notifier.clone());

    run_cron(&runner, "broken").await;
    run_cron(&runner, "local").await;

    let sent = notifier.sent.lock().clone();
    assert_eq!(
        sent,
        vec![
            ("http://hooks.local/slack".to_string(), PayloadKind::Slack, 1),
            ("http://hooks.local/broken".to_string(), PayloadKind::Generic, 1),
            ("http://hooks.local/slack".to_string(), PayloadKind::Slack, 1),
        ]
    );
}

#[tokio::test]
async fn test_webhook_failure_is_not_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryRunStore::new());
    let schedule = Schedule::new()
        .with_job("a", JobSpec::new(["true"]).with_on_success(OnEvent::new().webhook(server.uri()).trigger("b")))
        .with_job("b", JobSpec::new(["true"]));
    let notifier = Arc::new(WebhookNotifier::new(DEFAULT_TIMEOUT).unwrap());
    let runner = runner_with(schedule, store.clone(), notifier);

    let run = run_cron(&runner, "a").await;
    assert!(run.succeeded());
    assert_eq!(store.all("b").await.len(), 1);
    server.verify().await;
}

// ============================================================================
// Manual Runs and Persistence
// ============================================================================

#[tokio::test]
async fn test_manual_run_is_single_attempt() {
    let store = Arc::new(MemoryRunStore::new());
    let runner = runner(
        Schedule::new().with_job("flaky", JobSpec::new(["false"]).with_retries(3)),
        store.clone(),
    );

    let run = runner.run_manual("flaky").await.unwrap();
    assert_eq!(run.triggered_by, "manual");
    assert_eq!(store.all("flaky").await.len(), 1);

    let err = runner.run_manual("ghost").await.unwrap_err();
    assert!(matches!(err, EngineError::JobNotFound(name) if name == "ghost"));
}

#[tokio::test]
async fn test_persistence_failure_leaves_run_untouched() {
    let notifier = Arc::new(RecordingNotifier::default());
    let schedule = Schedule::new()
        .with_job(
            "a",
            JobSpec::new(["echo", "kept"]).with_on_success(
                OnEvent::new().trigger("b").webhook("http://hooks.local/a"),
            ),
        )
        .with_job("b", JobSpec::new(["echo", "dependent"]));
    let runner = runner_with(schedule, Arc::new(BrokenStore), notifier.clone());

    let run = run_cron(&runner, "a").await;
    assert_eq!(run.status, 0);
    assert_eq!(run.log, "kept\n");
    assert_eq!(run.triggered, vec!["b"]);

    let recent = runner.job("a").unwrap().recent_runs();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].status, 0);

    let dependent = runner.job("b").unwrap().recent_runs();
    assert_eq!(dependent.len(), 1);
    assert_eq!(dependent[0].triggered_by, "job[a]");
    assert_eq!(dependent[0].log, "dependent\n");

    assert_eq!(notifier.sent.lock().len(), 1);
}

#[tokio::test]
async fn test_runs_persist_to_file_log() {
    let temp_dir = TempDir::new().unwrap();
    let log = Arc::new(FileRunLog::open(temp_dir.path()).await.unwrap());
    let schedule = Schedule::new()
        .with_job("a", JobSpec::new(["echo", "one"]).with_on_success(OnEvent::new().trigger("b")))
        .with_job("b", JobSpec::new(["false"]));
    let runner = runner_with(schedule, log.clone(), Arc::new(RecordingNotifier::default()));

    run_cron(&runner, "a").await;
    runner.run_manual("a").await.unwrap();

    let a_runs = log.read_last("a", 10).await.unwrap();
    assert_eq!(triggers(&a_runs), vec!["cron", "manual"]);
    assert_eq!(a_runs[0].log, "one\n");
    assert_eq!(a_runs[0].triggered, vec!["b"]);
    assert!(a_runs[0].duration > Duration::ZERO);

    let b_runs = log.read_last("b", 1).await.unwrap();
    assert_eq!(b_runs.len(), 1);
    assert_eq!(b_runs[0].triggered_by, "job[a]");
    assert_eq!(b_runs[0].status, 1);
}

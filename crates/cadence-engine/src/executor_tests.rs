use super::*;
use chrono::{DateTime, TimeZone, Utc};
use tempfile::TempDir;

fn quiet() -> Executor {
    Executor::new().suppress_output(true)
}

fn sh(script: &str) -> JobSpec {
    JobSpec::new(["sh", "-c", script]).named("sh-job")
}

#[derive(Debug)]
struct FixedClock(DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[tokio::test]
async fn test_echo_template() {
    let job = JobSpec::new(["echo", "{{.msg}}"]).named("greet");
    let mut params = BTreeMap::new();
    params.insert("msg".to_string(), "hello".to_string());

    let run = quiet().execute(&job, "manual", &params).await;
    assert_eq!(run.status, 0);
    assert_eq!(run.log, "hello\n");
    assert_eq!(run.name, "greet");
    assert_eq!(run.triggered_by, "manual");
    assert_eq!(run.params["msg"], "hello");
}

#[tokio::test]
async fn test_declared_params_are_defaults() {
    let job = JobSpec::new(["echo", "{{.a}}-{{.b}}"])
        .with_param("a", "1")
        .with_param("b", "2");
    let mut params = BTreeMap::new();
    params.insert("b".to_string(), "9".to_string());

    let run = quiet().execute(&job, "cron", &params).await;
    assert_eq!(run.log, "1-9\n");
}

#[tokio::test]
async fn test_unrenderable_argument_passed_literally() {
    let job = JobSpec::new(["echo", "{{.missing}}", "{{.msg"]);
    let run = quiet().execute(&job, "cron", &BTreeMap::new()).await;
    assert_eq!(run.status, 0);
    assert_eq!(run.log, "{{.missing}} {{.msg\n");
}

#[tokio::test]
async fn test_single_element_runs_without_arguments() {
    let job = JobSpec::new(["true"]);
    let run = quiet().execute(&job, "cron", &BTreeMap::new()).await;
    assert_eq!(run.status, 0);
    assert!(run.log.is_empty());
}

#[tokio::test]
async fn test_empty_command_never_starts() {
    let job = JobSpec::default().named("empty");
    let run = quiet().execute(&job, "cron", &BTreeMap::new()).await;
    assert_eq!(run.status, STATUS_NOT_COMPLETED);
    assert_eq!(run.log, "job unable to start: no command specified");
}

#[tokio::test]
async fn test_missing_executable_is_start_failure() {
    let job = JobSpec::new(["/nonexistent/cadence-test-binary"]);
    let run = quiet().execute(&job, "cron", &BTreeMap::new()).await;
    assert_eq!(run.status, STATUS_NOT_COMPLETED);
    assert!(run.log.starts_with("job unable to start: "));
    assert!(run.log.len() > "job unable to start: ".len());
}

#[tokio::test]
async fn test_exit_code_becomes_status() {
    let run = quiet().execute(&sh("exit 3"), "cron", &BTreeMap::new()).await;
    assert_eq!(run.status, 3);
    assert!(run.completed());
}

#[tokio::test]
async fn test_stdout_and_stderr_merged() {
    let run = quiet()
        .execute(&sh("echo out; echo err 1>&2"), "cron", &BTreeMap::new())
        .await;
    assert_eq!(run.status, 0);
    assert!(run.log.contains("out\n"));
    assert!(run.log.contains("err\n"));
}

#[tokio::test]
async fn test_killed_by_signal_is_sentinel() {
    let run = quiet().execute(&sh("kill -9 $$"), "cron", &BTreeMap::new()).await;
    assert_eq!(run.status, STATUS_NOT_COMPLETED);
}

#[tokio::test]
async fn test_env_overlays_inherited_environment() {
    let job = sh("echo \"$CADENCE_EXEC_TEST_VAR:${PATH:+has-path}\"")
        .with_env("CADENCE_EXEC_TEST_VAR", "from-job");
    let run = quiet().execute(&job, "cron", &BTreeMap::new()).await;
    assert_eq!(run.log, "from-job:has-path\n");
}

#[tokio::test]
async fn test_working_directory() {
    let temp_dir = TempDir::new().unwrap();
    let job = JobSpec::new(["pwd"]).with_working_directory(temp_dir.path());
    let run = quiet().execute(&job, "cron", &BTreeMap::new()).await;

    let expected = temp_dir.path().canonicalize().unwrap();
    assert_eq!(run.log.trim_end(), expected.to_string_lossy());
}

#[tokio::test]
async fn test_duration_always_measured() {
    let run = quiet().execute(&sh("sleep 0.1"), "cron", &BTreeMap::new()).await;
    assert!(run.duration >= std::time::Duration::from_millis(100));

    let run = quiet()
        .execute(&sh("sleep 0.1; exit 2"), "cron", &BTreeMap::new())
        .await;
    assert!(run.duration >= std::time::Duration::from_millis(100));
}

#[tokio::test]
async fn test_trigger_time_from_clock() {
    let at = Utc.with_ymd_and_hms(2024, 6, 1, 8, 30, 0).unwrap();
    let executor = quiet().with_clock(Arc::new(FixedClock(at)));
    let run = executor.execute(&JobSpec::new(["true"]), "cron", &BTreeMap::new()).await;
    assert_eq!(run.triggered_at, at);
}

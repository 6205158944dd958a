use std::time::{Duration, Instant};

use malscope::config::MonitorConfig;
use malscope::monitor::{monitor_file, ExecutionMonitor, MonitorState};

#[cfg(unix)]
use crate::common::write_script;

#[tokio::test]
async fn missing_sample_is_input_error() {
    let err = monitor_file("/no/such/sample.bin", 1).await.unwrap_err();
    assert!(err.is_input_error());
}

#[cfg(unix)]
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn never_exiting_sample_is_killed_at_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "spin.sh", "while true; do sleep 1; done");

    let started = Instant::now();
    let report = monitor_file(&script, 1).await.expect("monitor run");
    let elapsed = started.elapsed();

    let teardown = MonitorConfig::default().teardown_budget();
    assert!(
        elapsed < Duration::from_secs(1) + teardown + Duration::from_secs(5),
        "took {elapsed:?}"
    );
    assert!(report.execution.timeout_occurred);
    assert_eq!(report.execution.return_code, -1);
    assert_eq!(report.timeout_secs, 1);
}

#[cfg(unix)]
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn running_sample_shows_up_as_new_process() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "nap.sh", "sleep 2\necho woke");

    let config = MonitorConfig {
        timeout_secs: 10,
        network_interval_ms: 200,
        process_interval_ms: 100,
        ..MonitorConfig::default()
    };
    let mut monitor = ExecutionMonitor::new(config);
    let report = monitor.run(&script).await.expect("monitor run");

    assert_eq!(monitor.state(), MonitorState::Finalized);
    assert!(!report.execution.timeout_occurred);
    assert_eq!(report.execution.return_code, 0);
    assert_eq!(report.execution.stdout.trim(), "woke");
    assert!(report.changes.new_processes_created);
    assert_eq!(report.changes.new_processes, report.process_activity.len());
    assert_eq!(report.changes.new_connections, report.network_activity.len());
    assert!(report.started_at <= report.finished_at);

    let value = serde_json::to_value(&report).unwrap();
    assert!(value["baseline"]["processes"].is_array());
    assert!(value["execution"].get("error").is_none());
}

#[cfg(unix)]
#[tokio::test]
async fn non_executable_sample_records_spawn_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = crate::common::write_sample(dir.path(), "data.bin", b"\x00\x01\x02");

    let report = monitor_file(&path, 2).await.expect("report even when spawn fails");
    assert!(report.execution.error.is_some());
    assert_eq!(report.execution.return_code, -1);
    assert!(!report.execution.timeout_occurred);
}

#[cfg(unix)]
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn forked_child_is_recorded_and_output_kept() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "fork.sh", "sleep 30 &\nsleep 1\necho bye");

    let config = MonitorConfig {
        timeout_secs: 10,
        process_interval_ms: 100,
        network_interval_ms: 200,
        termination_grace_ms: 500,
        teardown_budget_secs: 2,
        ..MonitorConfig::default()
    };
    let started = Instant::now();
    let report = ExecutionMonitor::new(config).run(&script).await.expect("monitor run");
    let elapsed = started.elapsed();

    assert_eq!(report.execution.return_code, 0);
    assert!(!report.execution.timeout_occurred);
    assert_eq!(report.execution.stdout, "bye\n");
    assert!(report.changes.new_processes_created);
    assert!(
        report.process_activity.iter().any(|e| e.process.name == "sleep"),
        "names: {:?}",
        report.process_activity.iter().map(|e| &e.process.name).collect::<Vec<_>>()
    );
    // One second of sample, then the group sweep; never the 30s sleep
    assert!(elapsed < Duration::from_secs(1 + 2 + 3), "took {elapsed:?}");
}

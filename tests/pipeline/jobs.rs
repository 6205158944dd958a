use malscope::analysis::AnalysisOptions;
use malscope::jobs::{run_job, JobStatus, JobStore};
use malscope::{AnalysisConfig, RiskLevel};

use crate::common::write_sample;

#[tokio::test]
async fn static_job_reports_progress_and_result() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_sample(
        dir.path(),
        "stage2.bin",
        b"\x00GET http://198.51.100.7/payload HKCU\\Software\\Run\x00",
    );

    let store = JobStore::new();
    let id = store.submit(&path);
    assert_eq!(store.get(id).unwrap().status.progress(), 0);

    run_job(&store, id, AnalysisOptions::static_only(), &AnalysisConfig::default())
        .await
        .expect("job runs");

    let job = store.get(id).unwrap();
    assert_eq!(job.status.progress(), 100);
    let JobStatus::Completed { result } = job.status else {
        panic!("job did not complete: {:?}", job.status);
    };
    // ip, url, registry key
    assert_eq!(result.risk.score, 30);
    assert_eq!(result.risk.level, RiskLevel::Low);
    assert_eq!(result.summary.file_analyzed, path);

    let json = result.to_json_string(true).unwrap();
    assert!(json.contains("\"report_id\""));
    assert!(!json.contains("\"dynamic\""));
}

#[tokio::test]
async fn concurrent_jobs_are_independent() {
    let dir = tempfile::tempdir().unwrap();
    let clean = write_sample(dir.path(), "clean.txt", b"nothing here");
    let store = JobStore::new();

    let good = store.submit(&clean);
    let bad = store.submit(dir.path().join("missing.bin"));
    let config = AnalysisConfig::default();

    let (a, b) = tokio::join!(
        run_job(&store, good, AnalysisOptions::static_only(), &config),
        run_job(&store, bad, AnalysisOptions::static_only(), &config),
    );
    assert!(a.is_ok());
    assert!(b.is_err());

    assert!(matches!(store.get(good).unwrap().status, JobStatus::Completed { .. }));
    match store.take(bad).unwrap().status {
        JobStatus::Failed { message } => assert!(message.starts_with("Analysis failed")),
        other => panic!("unexpected status {other:?}"),
    }
    assert_eq!(store.len(), 1);
}

#[test]
fn status_serializes_with_state_tag() {
    let store = JobStore::new();
    let id = store.submit("/tmp/x");
    store.set_progress(id, 50, "Static analysis complete").unwrap();

    let value = serde_json::to_value(store.get(id).unwrap()).unwrap();
    assert_eq!(value["status"]["state"], "running");
    assert_eq!(value["status"]["progress"], 50);
}

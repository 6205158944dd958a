//! Per-job progress tracking for callers that run analyses in the background.
//!
//! A [`JobStore`] is owned by the caller and cloned cheaply; each job moves
//! Queued, then Running (with progress), then Completed or Failed, and is
//! removed with [`JobStore::take`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::analysis::{analyze_path, AnalysisOptions, CombinedAnalysis};
use crate::config::AnalysisConfig;
use crate::error::{MalscopeError, Result};
use crate::timeout::{with_timeout, TimeoutConfig};

/// Time allowed for everything in a job other than running the sample.
pub const JOB_OVERHEAD_BUDGET: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running { progress: u8, message: String },
    Completed { result: Box<CombinedAnalysis> },
    Failed { message: String },
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed { .. } | JobStatus::Failed { .. })
    }

    /// Percent complete as reported to pollers.
    pub fn progress(&self) -> u8 {
        match self {
            JobStatus::Queued => 0,
            JobStatus::Running { progress, .. } => *progress,
            JobStatus::Completed { .. } | JobStatus::Failed { .. } => 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Job {
    pub id: Uuid,
    pub path: PathBuf,
    pub submitted_at: DateTime<Utc>,
    pub status: JobStatus,
}

/// Shared job table. Clones share the same jobs.
#[derive(Debug, Clone, Default)]
pub struct JobStore {
    jobs: Arc<RwLock<HashMap<Uuid, Job>>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave a job half-written, so
    // poisoning is ignored.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<Uuid, Job>> {
        self.jobs.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<Uuid, Job>> {
        self.jobs.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a sample for analysis and return its job id.
    pub fn submit<P: AsRef<Path>>(&self, path: P) -> Uuid {
        let id = Uuid::new_v4();
        let job = Job {
            id,
            path: path.as_ref().to_path_buf(),
            submitted_at: Utc::now(),
            status: JobStatus::Queued,
        };
        self.write().insert(id, job);
        id
    }

    fn transition(&self, id: Uuid, next: JobStatus) -> Result<()> {
        let mut jobs = self.write();
        let job = jobs.get_mut(&id).ok_or(MalscopeError::UnknownJob(id))?;
        if job.status.is_terminal() {
            warn!(job = %id, "ignoring update to finished job");
            return Ok(());
        }
        job.status = next;
        Ok(())
    }

    /// Record progress on a queued or running job.
    pub fn set_progress(&self, id: Uuid, progress: u8, message: &str) -> Result<()> {
        self.transition(
            id,
            JobStatus::Running {
                progress: progress.min(100),
                message: message.to_string(),
            },
        )
    }

    pub fn complete(&self, id: Uuid, result: CombinedAnalysis) -> Result<()> {
        self.transition(
            id,
            JobStatus::Completed {
                result: Box::new(result),
            },
        )
    }

    pub fn fail(&self, id: Uuid, message: impl Into<String>) -> Result<()> {
        self.transition(
            id,
            JobStatus::Failed {
                message: message.into(),
            },
        )
    }

    /// Current state of a job.
    pub fn get(&self, id: Uuid) -> Option<Job> {
        self.read().get(&id).cloned()
    }

    /// Remove a job, returning its final state.
    pub fn take(&self, id: Uuid) -> Option<Job> {
        self.write().remove(&id)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

/// Run a submitted job to completion, reporting progress into `store`.
///
/// The whole job is bounded by the monitor timeout plus teardown plus a
/// fixed overhead. Errors are recorded on the job and also returned.
pub async fn run_job(
    store: &JobStore,
    id: Uuid,
    options: AnalysisOptions,
    config: &AnalysisConfig,
) -> Result<()> {
    let path = store.get(id).ok_or(MalscopeError::UnknownJob(id))?.path;
    info!(job = %id, path = %path.display(), "job started");
    store.set_progress(id, 0, "Starting analysis")?;

    let mut budget = JOB_OVERHEAD_BUDGET;
    if options.dynamic_analysis {
        budget += config.monitor.timeout() + config.monitor.teardown_budget();
    }

    let outcome = with_timeout(
        TimeoutConfig::from_duration(budget, format!("job {id}")),
        analyze_path(&path, options, config, |progress, message| {
            if let Err(e) = store.set_progress(id, progress, message) {
                warn!(job = %id, error = %e, "progress update failed");
            }
        }),
    )
    .await;

    match outcome {
        Ok(result) => {
            info!(job = %id, score = result.risk.score, "job completed");
            store.complete(id, result)
        }
        Err(e) => {
            warn!(job = %id, error = %e, "job failed");
            store.fail(id, format!("Analysis failed: {e}"))?;
            Err(e)
        }
    }
}

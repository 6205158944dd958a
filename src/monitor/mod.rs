//! Execution monitor: run a sample under a hard timeout and record what
//! appeared on the host while it ran.
//!
//! A run moves through [`MonitorState`] in order. The baseline snapshot
//! seeds both sampling loops, so only identities that were not already
//! present are reported. The stop signal goes out the moment the wait on the
//! child ends; the loops are joined while termination and output capture
//! proceed, all under one teardown deadline, and a final snapshot closes the
//! run.

pub mod execute;
pub mod netstat;
pub mod sampler;
pub mod snapshot;

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use chrono::Utc;
use sysinfo::System;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::classify::{classify_activity, Classification};
use crate::config::MonitorConfig;
use crate::core::artifact::FileArtifact;
use crate::core::dynamic_report::{ChangeSummary, DynamicReport, SystemSnapshot};
use crate::error::{MalscopeError, Result};
use crate::timeout::within;
use execute::run_sample;
use sampler::{spawn_sampler, NetworkProbe, ProcessProbe};

/// Lifecycle of one monitoring run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Idle,
    BaselineCaptured,
    Running,
    NaturalExit,
    TimedOut,
    Finalized,
}

impl fmt::Display for MonitorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MonitorState::Idle => "IDLE",
            MonitorState::BaselineCaptured => "BASELINE_CAPTURED",
            MonitorState::Running => "RUNNING",
            MonitorState::NaturalExit => "NATURAL_EXIT",
            MonitorState::TimedOut => "TIMED_OUT",
            MonitorState::Finalized => "FINALIZED",
        };
        f.write_str(s)
    }
}

/// Monitors one sample per [`run`](ExecutionMonitor::run). State is private
/// to the instance.
#[derive(Debug)]
pub struct ExecutionMonitor {
    config: MonitorConfig,
    state: MonitorState,
}

async fn blocking_snapshot(mut sys: System) -> Result<(System, SystemSnapshot)> {
    tokio::task::spawn_blocking(move || {
        let snap = snapshot::capture_snapshot(&mut sys);
        (sys, snap)
    })
    .await
    .map_err(|e| MalscopeError::Internal(format!("snapshot task failed: {e}")))
}

async fn join_timeline<T>(handle: JoinHandle<Vec<T>>, deadline: Instant, name: &str) -> Vec<T> {
    let budget = deadline.saturating_duration_since(Instant::now());
    let abort = handle.abort_handle();
    match within(budget, name, handle).await {
        Some(Ok(timeline)) => timeline,
        Some(Err(e)) => {
            warn!(sampler = name, error = %e, "sampler task failed; timeline lost");
            Vec::new()
        }
        None => {
            abort.abort();
            Vec::new()
        }
    }
}

impl ExecutionMonitor {
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            config,
            state: MonitorState::Idle,
        }
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    fn transition(&mut self, next: MonitorState) {
        tracing::debug!(from = %self.state, to = %next, "monitor state");
        self.state = next;
    }

    /// Run the sample at `path` and report what it did.
    ///
    /// Fails only when `path` cannot be stat'ed. Spawn failures, timeouts
    /// and termination trouble are recorded on the report's execution record.
    pub async fn run(&mut self, path: &Path) -> Result<DynamicReport> {
        self.state = MonitorState::Idle;
        let artifact = FileArtifact::from_path(path).map_err(|source| MalscopeError::Input {
            path: path.to_path_buf(),
            source,
        })?;
        let started_at = Utc::now();
        info!(path = %path.display(), timeout_secs = self.config.timeout_secs, "dynamic analysis starting");

        let (sys, baseline) = blocking_snapshot(System::new()).await?;
        self.transition(MonitorState::BaselineCaptured);

        let seen_connections: HashSet<_> = baseline
            .connections
            .iter()
            .filter(|c| c.remote.is_some())
            .map(|c| c.key())
            .collect();
        let seen_pids: HashSet<u32> = baseline.processes.iter().map(|p| p.pid).collect();

        let (stop_tx, stop_rx) = watch::channel(false);
        let network = spawn_sampler(
            "network",
            NetworkProbe,
            seen_connections,
            self.config.network_interval(),
            stop_rx.clone(),
        );
        let processes = spawn_sampler(
            "process",
            ProcessProbe::new(),
            seen_pids,
            self.config.process_interval(),
            stop_rx,
        );
        self.transition(MonitorState::Running);

        let (exit_tx, exit_rx) = oneshot::channel::<Instant>();
        let sample = run_sample(path, &self.config, move |deadline| {
            // Receivers may already be gone if a sampler task died
            let _ = stop_tx.send(true);
            let _ = exit_tx.send(deadline);
        });
        let fallback = self.config.teardown_budget();
        let timelines = async move {
            let deadline = exit_rx.await.unwrap_or_else(|_| Instant::now() + fallback);
            tokio::join!(
                join_timeline(network, deadline, "network"),
                join_timeline(processes, deadline, "process"),
            )
        };
        let (execution, (network_activity, process_activity)) = tokio::join!(sample, timelines);
        self.transition(if execution.record.timeout_occurred {
            MonitorState::TimedOut
        } else {
            MonitorState::NaturalExit
        });

        let (_, final_snapshot) = blocking_snapshot(sys).await?;

        let classification = Classification {
            tags: classify_activity(&network_activity, &process_activity),
        };
        let changes = ChangeSummary {
            network_activity_detected: !network_activity.is_empty(),
            new_processes_created: !process_activity.is_empty(),
            new_connections: network_activity.len(),
            new_processes: process_activity.len(),
            suspicious_connections: classification.suspicious_connections(),
            suspicious_processes: classification.suspicious_processes(),
        };
        self.transition(MonitorState::Finalized);

        info!(
            return_code = execution.record.return_code,
            timeout_occurred = execution.record.timeout_occurred,
            new_connections = changes.new_connections,
            new_processes = changes.new_processes,
            "dynamic analysis complete"
        );

        Ok(DynamicReport {
            artifact,
            timeout_secs: self.config.timeout_secs,
            started_at,
            finished_at: Utc::now(),
            execution: execution.record,
            baseline,
            final_snapshot,
            network_activity,
            process_activity,
            changes,
        })
    }
}

/// Monitor the sample at `path` for up to `timeout_secs`, with default
/// sampling intervals.
pub async fn monitor_file<P: AsRef<Path>>(path: P, timeout_secs: u64) -> Result<DynamicReport> {
    let config = MonitorConfig {
        timeout_secs,
        ..MonitorConfig::default()
    };
    monitor_file_with(path, &config).await
}

/// Monitor the sample at `path` with explicit configuration.
pub async fn monitor_file_with<P: AsRef<Path>>(path: P, config: &MonitorConfig) -> Result<DynamicReport> {
    ExecutionMonitor::new(config.clone()).run(path.as_ref()).await
}

/// Blocking wrapper around [`monitor_file`] for callers without a runtime.
pub fn monitor_file_blocking<P: AsRef<Path>>(path: P, timeout_secs: u64) -> Result<DynamicReport> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| MalscopeError::Internal(format!("failed to build runtime: {e}")))?;
    runtime.block_on(monitor_file(path, timeout_secs))
}

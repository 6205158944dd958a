//! Combined analysis: run the requested analyses, classify, score, and
//! assemble one serializable result.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::classify::{classify, Classification};
use crate::config::AnalysisConfig;
use crate::core::assessment::RiskAssessment;
use crate::core::dynamic_report::{ConnectionEvent, DynamicReport, ProcessEvent};
use crate::core::static_report::StaticReport;
use crate::error::{MalscopeError, Result};
use crate::extractor::extract_file_with;
use crate::monitor::monitor_file_with;
use crate::score::ScoreEngine;

/// Maximum timeline entries shown per category in a summary.
pub const DIGEST_SAMPLES: usize = 10;

/// Which analyses to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisOptions {
    pub static_analysis: bool,
    pub dynamic_analysis: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            static_analysis: true,
            dynamic_analysis: true,
        }
    }
}

impl AnalysisOptions {
    pub fn static_only() -> Self {
        Self {
            static_analysis: true,
            dynamic_analysis: false,
        }
    }
}

/// Total count plus the first few entries of a timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineDigest<T> {
    pub total: usize,
    pub samples: Vec<T>,
}

impl<T: Clone> TimelineDigest<T> {
    pub fn of(timeline: &[T]) -> Self {
        Self {
            total: timeline.len(),
            samples: timeline.iter().take(DIGEST_SAMPLES).cloned().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub file_analyzed: PathBuf,
    pub static_analysis_completed: bool,
    pub dynamic_analysis_completed: bool,
    pub key_findings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_activity: Option<TimelineDigest<ConnectionEvent>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process_activity: Option<TimelineDigest<ProcessEvent>>,
}

impl AnalysisSummary {
    fn build(path: &Path, static_report: Option<&StaticReport>, dynamic: Option<&DynamicReport>) -> Self {
        let mut key_findings = Vec::new();
        if let Some(s) = static_report {
            if !s.indicators.is_empty() {
                key_findings.push(format!(
                    "{} suspicious indicator(s) found by static analysis",
                    s.indicators.len()
                ));
            }
        }
        if let Some(d) = dynamic {
            if d.changes.network_activity_detected {
                key_findings.push("Network activity detected during execution".to_string());
            }
            if d.changes.new_processes_created {
                key_findings.push("New processes created during execution".to_string());
            }
            if d.execution.timeout_occurred {
                key_findings.push(format!(
                    "Sample was still running after {}s and was terminated",
                    d.timeout_secs
                ));
            }
        }
        Self {
            file_analyzed: path.to_path_buf(),
            static_analysis_completed: static_report.is_some(),
            dynamic_analysis_completed: dynamic.is_some(),
            key_findings,
            network_activity: dynamic.map(|d| TimelineDigest::of(&d.network_activity)),
            process_activity: dynamic.map(|d| TimelineDigest::of(&d.process_activity)),
        }
    }
}

/// Everything known about one sample after one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedAnalysis {
    pub report_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "static", skip_serializing_if = "Option::is_none")]
    pub static_analysis: Option<StaticReport>,
    #[serde(rename = "dynamic", skip_serializing_if = "Option::is_none")]
    pub dynamic_analysis: Option<DynamicReport>,
    pub classification: Classification,
    pub summary: AnalysisSummary,
    pub risk: RiskAssessment,
}

impl CombinedAnalysis {
    /// Assemble a result from already-produced reports.
    pub fn assemble(
        path: &Path,
        static_analysis: Option<StaticReport>,
        dynamic_analysis: Option<DynamicReport>,
        engine: &ScoreEngine,
    ) -> Self {
        let timestamp = Utc::now();
        let classification = classify(static_analysis.as_ref(), dynamic_analysis.as_ref());
        let risk = engine.assess(static_analysis.as_ref(), dynamic_analysis.as_ref(), &classification);
        let summary = AnalysisSummary::build(path, static_analysis.as_ref(), dynamic_analysis.as_ref());
        Self {
            report_id: report_id(timestamp),
            timestamp,
            static_analysis,
            dynamic_analysis,
            classification,
            summary,
            risk,
        }
    }

    /// Serialize to JSON; absent sections are omitted rather than null.
    pub fn to_json_string(&self, pretty: bool) -> Result<String> {
        let s = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(s)
    }
}

fn report_id(at: DateTime<Utc>) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("malscope_{}_{}", at.format("%Y%m%d_%H%M%S"), &suffix[..8])
}

/// Run the requested analyses on `path` and score the result.
///
/// `progress` receives (percent, message) at each stage boundary. Fails only
/// when the sample cannot be read.
pub async fn analyze_path<F>(
    path: &Path,
    options: AnalysisOptions,
    config: &AnalysisConfig,
    mut progress: F,
) -> Result<CombinedAnalysis>
where
    F: FnMut(u8, &str) + Send,
{
    info!(
        path = %path.display(),
        static_analysis = options.static_analysis,
        dynamic_analysis = options.dynamic_analysis,
        "analysis starting"
    );

    let static_report = if options.static_analysis {
        progress(20, "Running static analysis");
        let owned_path = path.to_path_buf();
        let cfg = config.clone();
        let report = tokio::task::spawn_blocking(move || extract_file_with(&owned_path, &cfg))
            .await
            .map_err(|e| MalscopeError::Internal(format!("static analysis task failed: {e}")))??;
        progress(50, "Static analysis complete");
        Some(report)
    } else {
        None
    };

    let dynamic_report = if options.dynamic_analysis {
        progress(60, "Running dynamic analysis");
        let report = monitor_file_with(path, &config.monitor).await?;
        progress(80, "Dynamic analysis complete");
        Some(report)
    } else {
        None
    };

    progress(90, "Scoring");
    let engine = ScoreEngine::new(config.scoring.clone());
    let analysis = CombinedAnalysis::assemble(path, static_report, dynamic_report, &engine);
    info!(
        report_id = %analysis.report_id,
        score = analysis.risk.score,
        level = %analysis.risk.level,
        "analysis complete"
    );
    Ok(analysis)
}

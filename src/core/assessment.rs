//! Suspicion tags and the final risk assessment.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::LevelThresholds;
use crate::core::static_report::IndicatorKind;

/// What a tag is attached to, by index into its report's collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "index", rename_all = "snake_case")]
pub enum TagSubject {
    /// `DynamicReport::network_activity[i]`
    Connection(usize),
    /// `DynamicReport::process_activity[i]`
    Process(usize),
    /// `StaticReport::indicators[i]`
    Indicator(usize),
}

/// Why a subject was considered suspicious.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum SuspicionReason {
    /// Remote endpoint outside the private and loopback ranges
    PublicRemoteAddress,
    /// Remote port commonly used by backdoors and reverse shells
    AbusedPort(u16),
    /// Process name matches a known shell or network tool
    SuspiciousProcessName,
    /// Command line mentions downloading or encoding
    SuspiciousCommandLine,
    /// Static pattern match in the sample's bytes
    StaticIndicator(IndicatorKind),
}

impl fmt::Display for SuspicionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PublicRemoteAddress => f.write_str("Connection to external IP"),
            Self::AbusedPort(port) => write!(f, "Connection to suspicious port {port}"),
            Self::SuspiciousProcessName => f.write_str("Suspicious process name"),
            Self::SuspiciousCommandLine => f.write_str("Suspicious command line"),
            Self::StaticIndicator(kind) => write!(f, "Static indicator {kind}"),
        }
    }
}

/// One reason attached to one subject. A subject may carry several tags.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SuspicionTag {
    pub subject: TagSubject,
    #[serde(flatten)]
    pub reason: SuspicionReason,
}

/// Ordered risk levels, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum RiskLevel {
    Benign,
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Map a total score onto a level, checking the highest threshold first.
    pub fn from_score(score: u32, thresholds: &LevelThresholds) -> Self {
        if score >= thresholds.critical {
            RiskLevel::Critical
        } else if score >= thresholds.high {
            RiskLevel::High
        } else if score >= thresholds.medium {
            RiskLevel::Medium
        } else if score >= thresholds.low {
            RiskLevel::Low
        } else {
            RiskLevel::Benign
        }
    }

    /// Display color token for the level.
    pub fn color(&self) -> &'static str {
        match self {
            RiskLevel::Critical => "#dc3545",
            RiskLevel::High => "#fd7e14",
            RiskLevel::Medium => "#ffc107",
            RiskLevel::Low => "#20c997",
            RiskLevel::Benign => "#28a745",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Critical => "Critical",
            RiskLevel::High => "High",
            RiskLevel::Medium => "Medium",
            RiskLevel::Low => "Low",
            RiskLevel::Benign => "Benign",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregated verdict over both reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub score: u32,
    pub level: RiskLevel,
    pub color: String,
    /// Human-readable contributions in accumulation order
    pub factors: Vec<String>,
}

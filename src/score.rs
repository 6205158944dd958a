//! Risk scoring over static and dynamic reports.
//!
//! Factors accumulate in a fixed order: static indicators, entropy, network
//! presence, process presence, suspicious connection tags, suspicious
//! process tags. The level is a threshold function of the total.

use tracing::debug;

use crate::classify::{classify, Classification};
use crate::config::ScoringConfig;
use crate::core::assessment::{RiskAssessment, RiskLevel};
use crate::core::dynamic_report::DynamicReport;
use crate::core::static_report::StaticReport;

/// Weighted aggregation of both reports into one assessment.
#[derive(Debug, Clone, Default)]
pub struct ScoreEngine {
    config: ScoringConfig,
}

/// Accumulates score and factor strings in insertion order.
struct Tally {
    score: u32,
    factors: Vec<String>,
}

impl Tally {
    fn add(&mut self, weight: u32, factor: String) {
        self.score = self.score.saturating_add(weight);
        self.factors.push(factor);
    }
}

impl ScoreEngine {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Score reports with a precomputed classification.
    ///
    /// A missing report contributes nothing; the result is the same as for
    /// an empty one.
    pub fn assess(
        &self,
        static_report: Option<&StaticReport>,
        dynamic: Option<&DynamicReport>,
        classification: &Classification,
    ) -> RiskAssessment {
        let w = &self.config.weights;
        let mut tally = Tally {
            score: 0,
            factors: Vec::new(),
        };

        if let Some(s) = static_report {
            for indicator in &s.indicators {
                tally.add(
                    w.static_indicator,
                    format!("Static indicator: {}", indicator.description),
                );
            }
            if s.entropy > self.config.entropy_threshold {
                tally.add(
                    w.high_entropy,
                    format!(
                        "High entropy ({:.2} bits/byte) - file may be packed or encrypted",
                        s.entropy
                    ),
                );
            }
        }

        if let Some(d) = dynamic {
            if !d.network_activity.is_empty() {
                tally.add(w.network_activity, "Network activity detected".to_string());
            }
            if !d.process_activity.is_empty() {
                tally.add(w.new_process, "New processes created".to_string());
            }
        }

        let connection_tags = classification.connection_tags();
        if connection_tags > 0 {
            tally.add(
                w.suspicious_connection.saturating_mul(connection_tags as u32),
                format!("{connection_tags} suspicious network connection(s)"),
            );
        }
        let process_tags = classification.process_tags();
        if process_tags > 0 {
            tally.add(
                w.suspicious_process.saturating_mul(process_tags as u32),
                format!("{process_tags} suspicious process(es)"),
            );
        }

        let level = RiskLevel::from_score(tally.score, &self.config.thresholds);
        debug!(score = tally.score, level = %level, factors = tally.factors.len(), "risk assessed");
        RiskAssessment {
            score: tally.score,
            level,
            color: level.color().to_string(),
            factors: tally.factors,
        }
    }

    /// Classify and score in one step.
    pub fn score(&self, static_report: Option<&StaticReport>, dynamic: Option<&DynamicReport>) -> RiskAssessment {
        let classification = classify(static_report, dynamic);
        self.assess(static_report, dynamic, &classification)
    }
}

/// Score reports with the default weight table and thresholds.
pub fn score(static_report: Option<&StaticReport>, dynamic: Option<&DynamicReport>) -> RiskAssessment {
    ScoreEngine::default().score(static_report, dynamic)
}

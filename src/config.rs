//! Configuration for the analysis core.
//!
//! Every section has defaults matching the documented behavior, and every
//! field may be omitted when loading from JSON.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{MalscopeError, Result};
use crate::io::IOLimits;
pub use crate::strings::StringsConfig;

/// Master configuration for one analysis run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Limits for reading the sample.
    pub io: IOLimits,
    /// String extraction and indicator sampling.
    pub strings: StringsConfig,
    /// Execution monitoring.
    pub monitor: MonitorConfig,
    /// Risk scoring weights and level thresholds.
    pub scoring: ScoringConfig,
}

impl AnalysisConfig {
    /// Parse a configuration from a JSON document.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load a configuration from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| MalscopeError::Input {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Reject configurations the engine cannot honor.
    pub fn validate(&self) -> Result<()> {
        if self.strings.min_length == 0 {
            return Err(MalscopeError::Config("strings.min_length must be at least 1".into()));
        }
        if self.monitor.network_interval_ms == 0 || self.monitor.process_interval_ms == 0 {
            return Err(MalscopeError::Config("sampling intervals must be non-zero".into()));
        }
        let t = &self.scoring.thresholds;
        if !(t.critical >= t.high && t.high >= t.medium && t.medium >= t.low) {
            return Err(MalscopeError::Config(
                "scoring thresholds must be ordered critical >= high >= medium >= low".into(),
            ));
        }
        Ok(())
    }
}

/// Execution monitoring configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// How long the sample may run before it is terminated.
    pub timeout_secs: u64,
    /// Network sampling period.
    pub network_interval_ms: u64,
    /// Process sampling period.
    pub process_interval_ms: u64,
    /// Wait between graceful terminate and forced kill, and after the kill.
    pub termination_grace_ms: u64,
    /// Upper bound on everything that happens after the timeout expires.
    pub teardown_budget_secs: u64,
    /// Maximum bytes kept per captured output stream.
    pub max_output_bytes: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            network_interval_ms: 1_000,
            process_interval_ms: 2_000,
            termination_grace_ms: 2_000,
            teardown_budget_secs: 10,
            max_output_bytes: 1024 * 1024,
        }
    }
}

impl MonitorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Sampling period, never shorter than 1 ms.
    pub fn network_interval(&self) -> Duration {
        Duration::from_millis(self.network_interval_ms.max(1))
    }

    /// Sampling period, never shorter than 1 ms.
    pub fn process_interval(&self) -> Duration {
        Duration::from_millis(self.process_interval_ms.max(1))
    }

    pub fn termination_grace(&self) -> Duration {
        Duration::from_millis(self.termination_grace_ms)
    }

    pub fn teardown_budget(&self) -> Duration {
        Duration::from_secs(self.teardown_budget_secs)
    }
}

/// Per-source score contributions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub static_indicator: u32,
    pub high_entropy: u32,
    pub network_activity: u32,
    pub new_process: u32,
    pub suspicious_connection: u32,
    pub suspicious_process: u32,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            static_indicator: 10,
            high_entropy: 20,
            network_activity: 30,
            new_process: 25,
            suspicious_connection: 15,
            suspicious_process: 20,
        }
    }
}

/// Inclusive lower bounds for each risk level above Benign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelThresholds {
    pub critical: u32,
    pub high: u32,
    pub medium: u32,
    pub low: u32,
}

impl Default for LevelThresholds {
    fn default() -> Self {
        Self {
            critical: 80,
            high: 60,
            medium: 40,
            low: 20,
        }
    }
}

/// Scoring configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub weights: ScoreWeights,
    /// Whole-file entropy strictly above this adds the high-entropy weight.
    pub entropy_threshold: f64,
    pub thresholds: LevelThresholds,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: ScoreWeights::default(),
            entropy_threshold: 7.5,
            thresholds: LevelThresholds::default(),
        }
    }
}

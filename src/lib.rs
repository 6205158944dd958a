//! Static and dynamic analysis core for candidate executables.
//!
//! Two entry points feed everything else:
//!
//! - [`extract_file`] reads a sample once and produces a [`StaticReport`]
//!   (hashes, container structure, entropy, strings, indicators).
//! - [`monitor_file`] runs the sample under a hard timeout while two sampling
//!   loops record new network connections and processes, producing a
//!   [`DynamicReport`].
//!
//! [`classify`] tags suspicious activity in those reports and [`score`] folds
//! both into a [`RiskAssessment`]. [`analysis::analyze_path`] and
//! [`jobs::JobStore`] wire the pieces together for callers that run one
//! analysis per submitted job.

/// Core data types shared by every component
pub mod core;

pub mod analysis;
pub mod classify;
pub mod config;
pub mod entropy;
pub mod error;
pub mod extractor;
pub mod formats;
pub mod hashing;
pub mod io;
pub mod jobs;
pub mod logging;
pub mod monitor;
pub mod score;
pub mod strings;
pub mod timeout;

pub use crate::classify::{classify, Classification};
pub use crate::config::AnalysisConfig;
pub use crate::core::assessment::{RiskAssessment, RiskLevel, SuspicionReason, SuspicionTag};
pub use crate::core::dynamic_report::DynamicReport;
pub use crate::core::static_report::StaticReport;
pub use crate::error::{MalscopeError, Result};
pub use crate::extractor::{extract_bytes, extract_file};
pub use crate::monitor::{monitor_file, monitor_file_blocking};
pub use crate::score::score;

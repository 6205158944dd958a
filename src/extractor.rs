//! Binary feature extractor: everything learned from a sample's bytes.
//!
//! [`extract_file`] is the only call here that can fail, and only when the
//! sample cannot be opened, read, or exceeds the size limit. Every other
//! sub-analysis embeds its own outcome in the report.

use std::path::Path;

use chrono::Utc;
use tracing::info;

use crate::config::AnalysisConfig;
use crate::core::artifact::FileArtifact;
use crate::core::static_report::StaticReport;
use crate::entropy::shannon_entropy;
use crate::error::{MalscopeError, Result};
use crate::formats::parse_structure;
use crate::hashing::compute_hashes;
use crate::io::SafeReader;
use crate::strings::{extract_strings, scan_indicators, StringsConfig};

/// Analyze the file at `path` with default configuration.
pub fn extract_file<P: AsRef<Path>>(path: P) -> Result<StaticReport> {
    extract_file_with(path, &AnalysisConfig::default())
}

/// Analyze the file at `path` with explicit configuration.
pub fn extract_file_with<P: AsRef<Path>>(path: P, config: &AnalysisConfig) -> Result<StaticReport> {
    let path = path.as_ref();
    let _span = crate::span_stage!("extract", path = %path.display()).entered();

    let reader = SafeReader::open(path, &config.io).map_err(|e| MalscopeError::from_io(path, e))?;
    let artifact = FileArtifact::from_path(path).map_err(|source| MalscopeError::Input {
        path: path.to_path_buf(),
        source,
    })?;

    let mut report = extract_bytes(reader.bytes(), &config.strings);
    report.artifact = Some(artifact);

    info!(
        size = reader.size(),
        entropy = report.entropy,
        strings = report.strings.total_found,
        indicators = report.indicators.len(),
        parsed = report.structure.parsed().is_some(),
        "static analysis complete"
    );
    Ok(report)
}

/// Byte-level core of the extractor. Pure function of `data`, apart from the
/// analysis timestamp.
pub fn extract_bytes(data: &[u8], cfg: &StringsConfig) -> StaticReport {
    StaticReport {
        artifact: None,
        hashes: Some(compute_hashes(data)),
        structure: parse_structure(data),
        entropy: shannon_entropy(data),
        strings: extract_strings(data, cfg),
        indicators: scan_indicators(data, cfg),
        analyzed_at: Utc::now(),
    }
}

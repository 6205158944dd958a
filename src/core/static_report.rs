//! Result types produced by the binary feature extractor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::artifact::FileArtifact;

/// md5/sha1/sha256 lowercase hex digests over the whole file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHashes {
    pub md5: String,
    pub sha1: String,
    pub sha256: String,
}

/// One section (or segment-backed section) of a parsed container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionInfo {
    pub name: String,
    pub virtual_address: u64,
    pub virtual_size: u64,
    pub raw_size: u64,
    /// Shannon entropy of the section's on-disk bytes
    pub entropy: f64,
}

/// Symbols imported from one library, in table order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportedLibrary {
    pub library: String,
    pub symbols: Vec<String>,
}

/// Structural facts about a recognized executable container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryStructure {
    /// Container format, e.g. "PE", "ELF", "MachO"
    pub format: String,
    /// Machine type, e.g. "0x14c" for PE or "X86_64"
    pub machine: String,
    /// Link timestamp from the header, where the format records one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compile_time: Option<DateTime<Utc>>,
    /// Entry point; an RVA for PE, a virtual address otherwise
    pub entry_point: u64,
    pub sections: Vec<SectionInfo>,
    /// Imports grouped by library in first-appearance order
    pub imports: Vec<ImportedLibrary>,
    pub exports: Vec<String>,
    pub is_dll: bool,
    pub is_exe: bool,
    /// Non-fatal problems found while walking tables
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub anomalies: Vec<String>,
}

impl BinaryStructure {
    /// Total imported symbols across all libraries.
    pub fn import_count(&self) -> usize {
        self.imports.iter().map(|l| l.symbols.len()).sum()
    }
}

/// Outcome of the structural parse: never absent, never a panic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureAnalysis {
    Parsed(BinaryStructure),
    ParseError(String),
}

impl StructureAnalysis {
    pub fn parsed(&self) -> Option<&BinaryStructure> {
        match self {
            Self::Parsed(s) => Some(s),
            Self::ParseError(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Parsed(_) => None,
            Self::ParseError(e) => Some(e),
        }
    }
}

/// Deduplicated printable strings, capped for report size.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringRecord {
    /// Distinct strings in first-occurrence order, at most the configured cap
    pub strings: Vec<String>,
    /// Distinct strings found before the cap was applied
    pub total_found: usize,
    /// True when `total_found` exceeds `strings.len()`
    pub truncated: bool,
}

/// Kinds of static indicator patterns, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IndicatorKind {
    Ip,
    Url,
    RegistryKey,
    SuspiciousFileRef,
}

impl IndicatorKind {
    pub const ALL: [IndicatorKind; 4] = [
        IndicatorKind::Ip,
        IndicatorKind::Url,
        IndicatorKind::RegistryKey,
        IndicatorKind::SuspiciousFileRef,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IndicatorKind::Ip => "IP",
            IndicatorKind::Url => "URL",
            IndicatorKind::RegistryKey => "REGISTRY_KEY",
            IndicatorKind::SuspiciousFileRef => "SUSPICIOUS_FILE_REF",
        }
    }

    /// Human description carried on the record and into score factors.
    pub fn description(&self) -> &'static str {
        match self {
            IndicatorKind::Ip => "Contains IP addresses",
            IndicatorKind::Url => "Contains URLs",
            IndicatorKind::RegistryKey => "Contains registry keys",
            IndicatorKind::SuspiciousFileRef => "References suspicious executables",
        }
    }
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregated matches of one indicator kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorRecord {
    pub kind: IndicatorKind,
    pub description: String,
    /// Total matches, duplicates included
    pub count: usize,
    /// First distinct matched values, at most five by default
    pub samples: Vec<String>,
}

/// Everything the extractor learns from a sample's bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticReport {
    /// Present when the report came from a file path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<FileArtifact>,
    /// Complete triple, or absent when the bytes could not be read
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hashes: Option<FileHashes>,
    pub structure: StructureAnalysis,
    /// Whole-file Shannon entropy in bits/byte
    pub entropy: f64,
    pub strings: StringRecord,
    pub indicators: Vec<IndicatorRecord>,
    pub analyzed_at: DateTime<Utc>,
}

impl StaticReport {
    pub fn indicator(&self, kind: IndicatorKind) -> Option<&IndicatorRecord> {
        self.indicators.iter().find(|r| r.kind == kind)
    }
}

//! Result types produced by the execution monitor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;

use crate::core::artifact::FileArtifact;

/// One process as seen in a process table sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessEntry {
    pub pid: u32,
    pub name: String,
    /// Arguments joined with single spaces
    pub cmdline: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Tcp => f.write_str("tcp"),
            Protocol::Udp => f.write_str("udp"),
        }
    }
}

/// One socket as seen in a connection table sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionEntry {
    pub protocol: Protocol,
    pub local: SocketAddr,
    /// None for listening or unconnected sockets
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote: Option<SocketAddr>,
    /// Kernel state name, e.g. "ESTABLISHED"; "NONE" for UDP
    pub status: String,
    /// Owning process, when it could be resolved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
}

impl ConnectionEntry {
    /// Identity used to decide whether a connection is new.
    pub fn key(&self) -> (SocketAddr, Option<SocketAddr>) {
        (self.local, self.remote)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryStats {
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub available_bytes: u64,
    /// used / total, in percent
    pub percent: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DiskUsage {
    pub total_bytes: u64,
    pub available_bytes: u64,
    pub percent: f64,
}

/// Point-in-time capture of the host's process and connection tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemSnapshot {
    pub captured_at: DateTime<Utc>,
    pub processes: Vec<ProcessEntry>,
    pub connections: Vec<ConnectionEntry>,
    /// Global CPU load in percent
    pub cpu_percent: f32,
    pub memory: MemoryStats,
    pub disk: DiskUsage,
}

/// How the sample's execution went.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// Exit code; negated signal number on a signal death; -1 on timeout
    pub return_code: i32,
    pub elapsed_secs: f64,
    pub stdout: String,
    pub stderr: String,
    pub timeout_occurred: bool,
    /// Spawn or termination failure, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A connection first observed during monitoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionEvent {
    pub observed_at: DateTime<Utc>,
    #[serde(flatten)]
    pub connection: ConnectionEntry,
}

/// A process first observed during monitoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessEvent {
    pub observed_at: DateTime<Utc>,
    #[serde(flatten)]
    pub process: ProcessEntry,
}

/// Condensed view of what changed between baseline and final state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSummary {
    pub network_activity_detected: bool,
    pub new_processes_created: bool,
    pub new_connections: usize,
    pub new_processes: usize,
    pub suspicious_connections: usize,
    pub suspicious_processes: usize,
}

/// Everything the monitor observed while the sample ran.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicReport {
    pub artifact: FileArtifact,
    pub timeout_secs: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub execution: ExecutionRecord,
    pub baseline: SystemSnapshot,
    pub final_snapshot: SystemSnapshot,
    pub network_activity: Vec<ConnectionEvent>,
    pub process_activity: Vec<ProcessEvent>,
    pub changes: ChangeSummary,
}

//! Shared helpers for integration tests.

use std::path::{Path, PathBuf};

use chrono::Utc;
use malscope::core::artifact::FileArtifact;
use malscope::core::dynamic_report::{
    ChangeSummary, ConnectionEntry, ConnectionEvent, DiskUsage, DynamicReport, ExecutionRecord,
    MemoryStats, ProcessEntry, ProcessEvent, Protocol, SystemSnapshot,
};

/// Write `data` to `dir/name` and return the path.
pub fn write_sample(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, data).expect("write sample");
    path
}

/// Write an executable shell script.
#[cfg(unix)]
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = write_sample(dir, name, format!("#!/bin/sh\n{body}\n").as_bytes());
    let mut perms = std::fs::metadata(&path).expect("stat script").permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).expect("chmod script");
    path
}

pub fn tcp_event(remote: &str) -> ConnectionEvent {
    ConnectionEvent {
        observed_at: Utc::now(),
        connection: ConnectionEntry {
            protocol: Protocol::Tcp,
            local: "192.168.1.20:51000".parse().expect("local addr"),
            remote: Some(remote.parse().expect("remote addr")),
            status: "ESTABLISHED".to_string(),
            pid: Some(4242),
        },
    }
}

pub fn process_event(pid: u32, name: &str, cmdline: &str) -> ProcessEvent {
    ProcessEvent {
        observed_at: Utc::now(),
        process: ProcessEntry {
            pid,
            name: name.to_string(),
            cmdline: cmdline.to_string(),
            create_time: None,
        },
    }
}

fn empty_snapshot() -> SystemSnapshot {
    SystemSnapshot {
        captured_at: Utc::now(),
        processes: Vec::new(),
        connections: Vec::new(),
        cpu_percent: 0.0,
        memory: MemoryStats::default(),
        disk: DiskUsage::default(),
    }
}

/// A finished run that exited cleanly with the given activity.
pub fn dynamic_report(network: Vec<ConnectionEvent>, processes: Vec<ProcessEvent>) -> DynamicReport {
    let now = Utc::now();
    DynamicReport {
        artifact: FileArtifact {
            path: PathBuf::from("/samples/fixture.bin"),
            name: "fixture.bin".to_string(),
            size: 0,
            created: None,
            modified: None,
            extension: "bin".to_string(),
        },
        timeout_secs: 30,
        started_at: now,
        finished_at: now,
        execution: ExecutionRecord {
            return_code: 0,
            elapsed_secs: 0.1,
            stdout: String::new(),
            stderr: String::new(),
            timeout_occurred: false,
            error: None,
        },
        baseline: empty_snapshot(),
        final_snapshot: empty_snapshot(),
        changes: ChangeSummary {
            network_activity_detected: !network.is_empty(),
            new_processes_created: !processes.is_empty(),
            new_connections: network.len(),
            new_processes: processes.len(),
            ..ChangeSummary::default()
        },
        network_activity: network,
        process_activity: processes,
    }
}

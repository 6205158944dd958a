//! Point-in-time system snapshots and process table sampling.

use chrono::{DateTime, Utc};
use sysinfo::{Disks, Process, System};
use tracing::debug;

use super::netstat;
use crate::core::dynamic_report::{DiskUsage, MemoryStats, ProcessEntry, SystemSnapshot};

pub(crate) fn process_entry(pid: u32, process: &Process) -> ProcessEntry {
    let start = process.start_time();
    ProcessEntry {
        pid,
        name: process.name().to_string(),
        cmdline: process.cmd().join(" "),
        create_time: (start > 0)
            .then(|| DateTime::<Utc>::from_timestamp(start as i64, 0))
            .flatten(),
    }
}

/// Refresh and list the process table, ordered by pid.
pub fn list_processes(sys: &mut System) -> Vec<ProcessEntry> {
    sys.refresh_processes();
    let mut out: Vec<ProcessEntry> = sys
        .processes()
        .iter()
        .map(|(pid, p)| process_entry(pid.as_u32(), p))
        .collect();
    out.sort_by_key(|p| p.pid);
    out
}

fn memory_stats(sys: &mut System) -> MemoryStats {
    sys.refresh_memory();
    let total = sys.total_memory();
    let used = sys.used_memory();
    MemoryStats {
        total_bytes: total,
        used_bytes: used,
        available_bytes: sys.available_memory(),
        percent: if total > 0 {
            used as f64 * 100.0 / total as f64
        } else {
            0.0
        },
    }
}

/// Usage of the filesystem mounted at `/`, or of the first disk listed.
fn disk_usage() -> DiskUsage {
    let disks = Disks::new_with_refreshed_list();
    let disk = disks
        .list()
        .iter()
        .find(|d| d.mount_point() == std::path::Path::new("/"))
        .or_else(|| disks.list().first());
    match disk {
        Some(d) => {
            let total = d.total_space();
            let available = d.available_space();
            DiskUsage {
                total_bytes: total,
                available_bytes: available,
                percent: if total > 0 {
                    (total - available.min(total)) as f64 * 100.0 / total as f64
                } else {
                    0.0
                },
            }
        }
        None => DiskUsage::default(),
    }
}

/// Global CPU load. sysinfo needs two refreshes a minimum interval apart.
fn cpu_percent(sys: &mut System) -> f32 {
    sys.refresh_cpu();
    std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
    sys.refresh_cpu();
    sys.global_cpu_info().cpu_usage()
}

/// Capture processes, connections, CPU, memory and disk usage. Blocking.
///
/// A connection table that cannot be read yields an empty connection set;
/// snapshots never fail.
pub fn capture_snapshot(sys: &mut System) -> SystemSnapshot {
    let captured_at = Utc::now();
    let processes = list_processes(sys);
    let connections = netstat::list_connections().unwrap_or_else(|e| {
        debug!(error = %e, "connection table unavailable for snapshot");
        Vec::new()
    });
    let cpu_percent = cpu_percent(sys);
    let memory = memory_stats(sys);
    let disk = disk_usage();

    debug!(
        processes = processes.len(),
        connections = connections.len(),
        cpu_percent,
        "snapshot captured"
    );
    SystemSnapshot {
        captured_at,
        processes,
        connections,
        cpu_percent,
        memory,
        disk,
    }
}

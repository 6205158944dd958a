//! Host connection table, read from `/proc/net/{tcp,tcp6,udp,udp6}`.
//!
//! Owning pids are resolved by matching socket inodes against the
//! `socket:[inode]` links under `/proc/<pid>/fd`. Sockets owned by processes
//! we cannot inspect keep `pid: None`. On platforms without procfs the table
//! is empty.

use std::collections::HashMap;
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use crate::core::dynamic_report::{ConnectionEntry, Protocol};

/// Decode an `ADDR:PORT` field. Address words are in host byte order.
fn parse_hex_addr(hex: &str) -> Option<SocketAddr> {
    let (ip_hex, port_hex) = hex.split_once(':')?;
    let port = u16::from_str_radix(port_hex, 16).ok()?;
    let ip = match ip_hex.len() {
        8 => {
            let word = u32::from_str_radix(ip_hex, 16).ok()?;
            IpAddr::V4(Ipv4Addr::from(word.to_ne_bytes()))
        }
        32 => {
            let mut octets = [0u8; 16];
            for (i, chunk) in octets.chunks_exact_mut(4).enumerate() {
                let word = u32::from_str_radix(ip_hex.get(i * 8..i * 8 + 8)?, 16).ok()?;
                chunk.copy_from_slice(&word.to_ne_bytes());
            }
            IpAddr::V6(Ipv6Addr::from(octets))
        }
        _ => return None,
    };
    Some(SocketAddr::new(ip, port))
}

/// TCP state number to human-readable name.
fn tcp_state_name(state: u8) -> &'static str {
    match state {
        0x01 => "ESTABLISHED",
        0x02 => "SYN_SENT",
        0x03 => "SYN_RECV",
        0x04 => "FIN_WAIT1",
        0x05 => "FIN_WAIT2",
        0x06 => "TIME_WAIT",
        0x07 => "CLOSE",
        0x08 => "CLOSE_WAIT",
        0x09 => "LAST_ACK",
        0x0A => "LISTEN",
        0x0B => "CLOSING",
        _ => "UNKNOWN",
    }
}

/// Parse one `/proc/net/*` table. `owners` maps socket inode to pid.
pub fn parse_proc_net(
    content: &str,
    protocol: Protocol,
    owners: &HashMap<u64, u32>,
) -> Vec<ConnectionEntry> {
    content
        .lines()
        .skip(1) // header line
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 10 {
                return None;
            }
            let local = parse_hex_addr(fields[1])?;
            let remote = parse_hex_addr(fields[2])?;
            let remote = (!(remote.ip().is_unspecified() && remote.port() == 0)).then_some(remote);
            let status = match protocol {
                Protocol::Tcp => {
                    let state = u8::from_str_radix(fields[3], 16).ok()?;
                    tcp_state_name(state).to_string()
                }
                Protocol::Udp => "NONE".to_string(),
            };
            let pid = fields[9]
                .parse::<u64>()
                .ok()
                .and_then(|inode| owners.get(&inode).copied());
            Some(ConnectionEntry {
                protocol,
                local,
                remote,
                status,
                pid,
            })
        })
        .collect()
}

#[cfg(target_os = "linux")]
fn socket_owners() -> HashMap<u64, u32> {
    let mut owners = HashMap::new();
    let Ok(proc_dir) = std::fs::read_dir("/proc") else {
        return owners;
    };
    for entry in proc_dir.flatten() {
        let Some(pid) = entry.file_name().to_str().and_then(|s| s.parse::<u32>().ok()) else {
            continue;
        };
        // EPERM on other users' processes is expected
        let Ok(fds) = std::fs::read_dir(entry.path().join("fd")) else {
            continue;
        };
        for fd in fds.flatten() {
            let Ok(target) = std::fs::read_link(fd.path()) else {
                continue;
            };
            let target = target.to_string_lossy();
            if let Some(inode) = target
                .strip_prefix("socket:[")
                .and_then(|s| s.strip_suffix(']'))
                .and_then(|s| s.parse::<u64>().ok())
            {
                owners.insert(inode, pid);
            }
        }
    }
    owners
}

/// List every TCP and UDP socket on the host.
///
/// Fails only if the IPv4 TCP table cannot be read; the other tables are
/// optional (IPv6 may be disabled).
#[cfg(target_os = "linux")]
pub fn list_connections() -> io::Result<Vec<ConnectionEntry>> {
    let owners = socket_owners();
    let mut out = parse_proc_net(
        &std::fs::read_to_string("/proc/net/tcp")?,
        Protocol::Tcp,
        &owners,
    );
    for (path, protocol) in [
        ("/proc/net/tcp6", Protocol::Tcp),
        ("/proc/net/udp", Protocol::Udp),
        ("/proc/net/udp6", Protocol::Udp),
    ] {
        match std::fs::read_to_string(path) {
            Ok(content) => out.extend(parse_proc_net(&content, protocol, &owners)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
    }
    Ok(out)
}

#[cfg(not(target_os = "linux"))]
pub fn list_connections() -> io::Result<Vec<ConnectionEntry>> {
    Ok(Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TCP_SAMPLE: &str = "\
  sl  local_address rem_address   st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode
   0: 0100007F:0CEA 00000000:0000 0A 00000000:00000000 00:00000000 00000000     0        0 11111 1 0000000000000000 100 0 0 10 0
   1: 0F02000A:D2F0 2219B85D:01BB 01 00000000:00000000 00:00000000 00000000  1000        0 22222 1 0000000000000000 20 4 30 10 -1
   2: garbage line
";

    #[test]
    fn tcp_state_names() {
        assert_eq!(tcp_state_name(0x01), "ESTABLISHED");
        assert_eq!(tcp_state_name(0x0A), "LISTEN");
        assert_eq!(tcp_state_name(0xFF), "UNKNOWN");
    }

    #[test]
    #[cfg(target_endian = "little")]
    fn parses_tcp_table() {
        let owners = HashMap::from([(22222u64, 4242u32)]);
        let conns = parse_proc_net(TCP_SAMPLE, Protocol::Tcp, &owners);
        assert_eq!(conns.len(), 2);

        assert_eq!(conns[0].local, "127.0.0.1:3306".parse().unwrap());
        assert_eq!(conns[0].remote, None);
        assert_eq!(conns[0].status, "LISTEN");
        assert_eq!(conns[0].pid, None);

        assert_eq!(conns[1].local, "10.0.2.15:54000".parse().unwrap());
        assert_eq!(conns[1].remote, Some("93.184.25.34:443".parse().unwrap()));
        assert_eq!(conns[1].status, "ESTABLISHED");
        assert_eq!(conns[1].pid, Some(4242));
    }

    #[test]
    fn udp_status_is_none() {
        let sample = "header\n   0: 00000000:0044 00000000:0000 07 00000000:00000000 00:00000000 00000000     0        0 333 2 0000000000000000 0\n";
        let conns = parse_proc_net(sample, Protocol::Udp, &HashMap::new());
        assert_eq!(conns.len(), 1);
        assert_eq!(conns[0].status, "NONE");
        assert_eq!(conns[0].local.port(), 68);
        assert!(conns[0].remote.is_none());
    }

    #[test]
    #[cfg(target_endian = "little")]
    fn parses_ipv6_loopback() {
        let addr = parse_hex_addr("00000000000000000000000001000000:0016").unwrap();
        assert_eq!(addr, "[::1]:22".parse().unwrap());
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert!(parse_hex_addr("nothex:0016").is_none());
        assert!(parse_hex_addr("0100007F").is_none());
        assert!(parse_hex_addr("0100:0016").is_none());
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn lists_host_connections() {
        // The table may be empty in a network namespace, but reading must work
        assert!(list_connections().is_ok());
    }
}

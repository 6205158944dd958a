use malscope::core::static_report::IndicatorKind;
use malscope::strings::StringsConfig;
use malscope::{extract_bytes, extract_file, MalscopeError};

use crate::common::write_sample;

#[test]
fn hashes_are_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_sample(dir.path(), "same.bin", b"identical content");

    let a = extract_file(&path).expect("first run");
    let b = extract_file(&path).expect("second run");
    assert_eq!(a.hashes, b.hashes);
    assert_eq!(a.entropy, b.entropy);
    assert_eq!(a.strings, b.strings);
    assert_eq!(a.indicators, b.indicators);

    let hashes = a.hashes.expect("hashes");
    assert_eq!(hashes.md5.len(), 32);
    assert_eq!(hashes.sha1.len(), 40);
    assert_eq!(hashes.sha256.len(), 64);
}

#[test]
fn entropy_bounds() {
    let zeros = extract_bytes(&[0u8; 4096], &StringsConfig::default());
    assert_eq!(zeros.entropy, 0.0);

    let uniform: Vec<u8> = (0..=255u8).cycle().take(256 * 16).collect();
    let report = extract_bytes(&uniform, &StringsConfig::default());
    assert!((report.entropy - 8.0).abs() < 1e-9, "entropy {}", report.entropy);
}

#[test]
fn string_length_threshold() {
    let report = extract_bytes(b"abc\x00abcd\x00", &StringsConfig::default());
    assert_eq!(report.strings.strings, vec!["abcd".to_string()]);
    assert_eq!(report.strings.total_found, 1);
    assert!(!report.strings.truncated);
}

#[test]
fn three_distinct_ips() {
    let report = extract_bytes(b"hosts: 10.0.0.1, 8.8.8.8, 203.0.113.77", &StringsConfig::default());
    let ip = report.indicator(IndicatorKind::Ip).expect("ip indicator");
    assert_eq!(ip.count, 3);
    assert_eq!(ip.samples.len(), 3);
    assert_eq!(report.indicators.len(), 1);
}

#[test]
fn ip_count_is_total_matches() {
    let data = b"\x00c2 10.0.0.1 and 8.8.8.8 then 10.0.0.1 again\x00";
    let report = extract_bytes(data, &StringsConfig::default());

    let ip = report.indicator(IndicatorKind::Ip).expect("ip indicator");
    assert_eq!(ip.count, 3);
    assert_eq!(ip.samples, vec!["10.0.0.1", "8.8.8.8", "10.0.0.1"]);
    assert_eq!(ip.description, "Contains IP addresses");
}

#[test]
fn invalid_octets_are_not_ips() {
    let report = extract_bytes(b"version 999.1.2.3 build", &StringsConfig::default());
    assert!(report.indicator(IndicatorKind::Ip).is_none());
}

#[test]
fn indicator_kinds_in_fixed_order() {
    let data = b"net use powershell.exe HKEY_LOCAL_MACHINE\\Software\\Run https://evil.example/p 1.2.3.4";
    let report = extract_bytes(data, &StringsConfig::default());
    let kinds: Vec<_> = report.indicators.iter().map(|i| i.kind).collect();
    assert_eq!(
        kinds,
        vec![
            IndicatorKind::Ip,
            IndicatorKind::Url,
            IndicatorKind::RegistryKey,
            IndicatorKind::SuspiciousFileRef,
        ]
    );
}

#[test]
fn empty_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_sample(dir.path(), "empty", b"");

    let report = extract_file(&path).expect("empty file is analyzable");
    assert_eq!(report.hashes.as_ref().unwrap().md5, "d41d8cd98f00b204e9800998ecf8427e");
    assert_eq!(report.entropy, 0.0);
    assert!(report.strings.strings.is_empty());
    assert!(report.indicators.is_empty());
    assert!(report.structure.parsed().is_none());
    assert_eq!(report.artifact.as_ref().unwrap().extension, "");
}

#[test]
fn text_file_records_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_sample(dir.path(), "readme.txt", b"just some plain text");

    let report = extract_file(&path).unwrap();
    assert!(report.structure.error().is_some());
}

#[test]
fn missing_file_is_error() {
    let err = extract_file("/definitely/not/here.exe").unwrap_err();
    assert!(matches!(err, MalscopeError::Input { .. }));
    assert!(err.is_input_error());
}

#[test]
fn report_serializes() {
    let report = extract_bytes(b"see http://example.org/a", &StringsConfig::default());
    let value = serde_json::to_value(&report).unwrap();
    assert_eq!(value["indicators"][0]["kind"], "URL");
    assert!(value["structure"].get("parse_error").is_some());
}

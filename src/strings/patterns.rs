//! Precompiled byte-level patterns for the indicator scan.
//!
//! All regexes run over raw file bytes with Unicode mode off, so `\b` and
//! `\d` are ASCII-only and arbitrary binary input never fails to match.
//! IPv4 candidates are validated with `std::net::Ipv4Addr::from_str` after
//! the match.

use aho_corasick::AhoCorasick;
use once_cell::sync::Lazy;
use regex::bytes::Regex;

// IPv4 candidates (validate with std::net::Ipv4Addr after match)
pub static RE_IPV4_CANDIDATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?-u)\b(?:[0-9]{1,3}\.){3}[0-9]{1,3}\b").expect("valid ipv4 candidate regex")
});

// http/https URLs, stopping at whitespace, quotes, brackets and non-ASCII bytes
pub static RE_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?-u)(?i)https?://[\x21-\x7E&&[^<>"{}|\\^`\[\]]]+"#).expect("valid URL regex")
});

// Windows registry paths under a root key, full or abbreviated
pub static RE_REGISTRY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?-u)\b(?:HKEY_[A-Z_]+|HKLM|HKCU|HKCR|HKU|HKCC)\\[\x20-\x7E]*")
        .expect("valid registry regex")
});

/// Companion executables whose presence in a sample's bytes is suspicious.
pub const SUSPICIOUS_FILE_NAMES: &[&str] =
    &["cmd.exe", "powershell.exe", "regedit.exe", "taskmgr.exe"];

// Literal matcher over SUSPICIOUS_FILE_NAMES
pub static AC_SUSPICIOUS_FILES: Lazy<AhoCorasick> = Lazy::new(|| {
    AhoCorasick::new(SUSPICIOUS_FILE_NAMES).expect("valid suspicious file automaton")
});

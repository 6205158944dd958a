//! Pattern-based indicator scan over raw sample bytes.

use std::net::Ipv4Addr;
use std::str::FromStr;

use super::patterns::{
    AC_SUSPICIOUS_FILES, RE_IPV4_CANDIDATE, RE_REGISTRY, RE_URL, SUSPICIOUS_FILE_NAMES,
};
use super::StringsConfig;
use crate::core::static_report::{IndicatorKind, IndicatorRecord};

/// Running count plus the first few sampled values for one kind.
struct Tally {
    kind: IndicatorKind,
    count: usize,
    samples: Vec<String>,
    max_samples: usize,
    // Keep only the first occurrence of each value in `samples`
    distinct: bool,
}

impl Tally {
    /// Samples are the first matches in file order, repeats included.
    fn new(kind: IndicatorKind, max_samples: usize) -> Self {
        Self {
            kind,
            count: 0,
            samples: Vec::new(),
            max_samples,
            distinct: false,
        }
    }

    /// Samples are the first distinct values.
    fn distinct(kind: IndicatorKind, max_samples: usize) -> Self {
        Self {
            distinct: true,
            ..Self::new(kind, max_samples)
        }
    }

    fn hit(&mut self, value: &[u8]) {
        self.count += 1;
        if self.samples.len() >= self.max_samples {
            return;
        }
        let text = String::from_utf8_lossy(value);
        if self.distinct && self.samples.iter().any(|s| s == text.as_ref()) {
            return;
        }
        self.samples.push(text.into_owned());
    }

    fn finish(self) -> Option<IndicatorRecord> {
        (self.count > 0).then(|| IndicatorRecord {
            kind: self.kind,
            description: self.kind.description().to_string(),
            count: self.count,
            samples: self.samples,
        })
    }
}

fn is_valid_ipv4(candidate: &[u8]) -> bool {
    std::str::from_utf8(candidate)
        .ok()
        .and_then(|s| Ipv4Addr::from_str(s).ok())
        .is_some()
}

/// Scan `data` for every indicator kind.
///
/// Returns one record per kind with at least one match, in the order IP, URL,
/// REGISTRY_KEY, SUSPICIOUS_FILE_REF. `count` is the number of matches. IP,
/// URL and registry samples are the first matches as found; suspicious file
/// samples name each referenced executable once.
pub fn scan_indicators(data: &[u8], cfg: &StringsConfig) -> Vec<IndicatorRecord> {
    let n = cfg.max_indicator_samples;

    let mut ip = Tally::new(IndicatorKind::Ip, n);
    for m in RE_IPV4_CANDIDATE.find_iter(data) {
        if is_valid_ipv4(m.as_bytes()) {
            ip.hit(m.as_bytes());
        }
    }

    let mut url = Tally::new(IndicatorKind::Url, n);
    for m in RE_URL.find_iter(data) {
        url.hit(m.as_bytes());
    }

    let mut registry = Tally::new(IndicatorKind::RegistryKey, n);
    for m in RE_REGISTRY.find_iter(data) {
        registry.hit(m.as_bytes());
    }

    let mut files = Tally::distinct(IndicatorKind::SuspiciousFileRef, n);
    for m in AC_SUSPICIOUS_FILES.find_iter(data) {
        files.hit(SUSPICIOUS_FILE_NAMES[m.pattern().as_usize()].as_bytes());
    }

    [ip, url, registry, files]
        .into_iter()
        .filter_map(Tally::finish)
        .collect()
}

//! Linear scanners for printable ASCII and UTF-16LE runs.

use std::collections::HashSet;

use super::StringsConfig;
use crate::core::static_report::StringRecord;

#[inline]
fn is_printable(b: u8) -> bool {
    (0x20..=0x7E).contains(&b)
}

/// Calls `emit` with every maximal printable ASCII run of at least `min_length` bytes.
pub fn ascii_runs<'a>(data: &'a [u8], min_length: usize, mut emit: impl FnMut(&'a [u8])) {
    let min_length = min_length.max(1);
    let mut start: Option<usize> = None;
    for (i, &b) in data.iter().enumerate() {
        if is_printable(b) {
            if start.is_none() {
                start = Some(i);
            }
        } else if let Some(s) = start.take() {
            if i - s >= min_length {
                emit(&data[s..i]);
            }
        }
    }
    if let Some(s) = start {
        if data.len() - s >= min_length {
            emit(&data[s..]);
        }
    }
}

/// Calls `emit` with every maximal UTF-16LE run of printable ASCII code units
/// (printable byte followed by 0x00) of at least `min_length` characters.
///
/// Both byte alignments are scanned so runs starting at odd offsets are found.
pub fn utf16le_runs(data: &[u8], min_length: usize, mut emit: impl FnMut(String)) {
    let min_length = min_length.max(1);
    for align in 0..2usize {
        let mut cur = String::new();
        let mut i = align;
        while i + 1 < data.len() {
            let (lo, hi) = (data[i], data[i + 1]);
            if hi == 0 && is_printable(lo) {
                cur.push(lo as char);
            } else {
                if cur.len() >= min_length {
                    emit(std::mem::take(&mut cur));
                }
                cur.clear();
            }
            i += 2;
        }
        if cur.len() >= min_length {
            emit(cur);
        }
    }
}

/// Extract deduplicated strings: ASCII runs first, then UTF-16LE runs, each in
/// first-occurrence order, capped at `cfg.max_strings`.
///
/// The whole input is always scanned; the cap only bounds the report.
pub fn extract_strings(data: &[u8], cfg: &StringsConfig) -> StringRecord {
    let mut seen: HashSet<String> = HashSet::new();
    let mut strings: Vec<String> = Vec::new();

    let mut keep = |s: String, strings: &mut Vec<String>| {
        if seen.contains(&s) {
            return;
        }
        if strings.len() < cfg.max_strings {
            strings.push(s.clone());
        }
        seen.insert(s);
    };

    ascii_runs(data, cfg.min_length, |run| {
        // Printable ASCII is valid UTF-8
        let text = String::from_utf8_lossy(run).into_owned();
        keep(text, &mut strings);
    });
    utf16le_runs(data, cfg.min_length, |text| keep(text, &mut strings));

    let total_found = seen.len();
    tracing::debug!(total_found, kept = strings.len(), "strings extracted");
    StringRecord {
        truncated: total_found > strings.len(),
        strings,
        total_found,
    }
}

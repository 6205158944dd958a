#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let cfg = malscope::strings::StringsConfig::default();
    let report = malscope::extract_bytes(data, &cfg);
    assert!((0.0..=8.0).contains(&report.entropy));
    assert!(report.strings.strings.len() <= cfg.max_strings);
});

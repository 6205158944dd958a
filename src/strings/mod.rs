//! String extraction and indicator scanning over raw sample bytes.
//!
//! Both passes are linear in the input size. Caps in [`StringsConfig`] bound
//! the size of what is reported, never how much of the input is scanned.

mod config;
pub mod indicators;
pub mod patterns;
pub mod scan;

pub use config::StringsConfig;
pub use indicators::scan_indicators;
pub use scan::extract_strings;

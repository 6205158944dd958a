//! Shannon entropy over byte-value histograms.
//!
//! Whole-file entropy feeds the risk score directly (values above 7.5
//! bits/byte usually mean packed or encrypted content); per-section entropy
//! is reported alongside the container structure.

pub mod core;

pub use self::core::{entropy_range, shannon_entropy};

//! Core data types for malscope analysis.
//!
//! The extractor fills a [`static_report::StaticReport`], the monitor a
//! [`dynamic_report::DynamicReport`]; classification and scoring produce the
//! types in [`assessment`]. All of them serialize with serde, with absent
//! optional sections omitted.

pub mod artifact;
pub mod assessment;
pub mod dynamic_report;
pub mod static_report;

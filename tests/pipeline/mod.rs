//! End-to-end checks of extraction, monitoring, classification and scoring.

mod extract;
mod jobs;
mod monitor;
mod scoring;

//! Error types for the malscope analysis core.
//!
//! Only input failures surface as errors from the two entry points. Parse
//! failures, sampling hiccups, timeouts and termination trouble are recorded
//! inside the reports instead.

use std::path::PathBuf;
use thiserror::Error;

use crate::io::error::IoError;

/// Main error type for malscope operations.
#[derive(Debug, Error)]
pub enum MalscopeError {
    /// The sample does not exist or cannot be opened/read
    #[error("Cannot read input {path}: {source}")]
    Input {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The sample exceeds the configured size limit
    #[error("Input {path} is {found} bytes, above the {limit} byte limit")]
    FileTooLarge { path: PathBuf, limit: u64, found: u64 },

    /// Operation exceeded its time budget
    #[error("Operation timeout after {seconds}s")]
    Timeout { seconds: u64 },

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Unknown job identifier
    #[error("Unknown job: {0}")]
    UnknownJob(uuid::Uuid),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl MalscopeError {
    /// Attach the offending path to a reader error.
    pub fn from_io(path: impl Into<PathBuf>, err: IoError) -> Self {
        let path = path.into();
        match err {
            IoError::FileTooLarge { limit, found } => Self::FileTooLarge { path, limit, found },
            IoError::StdIo(source) => Self::Input { path, source },
        }
    }

    /// True for failures caused by the submitted sample rather than the engine.
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::Input { .. } | Self::FileTooLarge { .. })
    }
}

/// Result type alias for malscope operations
pub type Result<T> = std::result::Result<T, MalscopeError>;

//! Time bounds for async operations.
//!
//! [`with_timeout`] turns an overrun into [`MalscopeError::Timeout`];
//! [`within`] is for teardown steps where an overrun is logged and the step
//! abandoned instead.

use crate::error::{MalscopeError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error, warn};

/// Timeout configuration for one named operation
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    /// Maximum duration for the operation
    pub duration: Duration,
    /// Whether to log timeout errors
    pub log_warnings: bool,
    /// Operation name for logging
    pub operation_name: String,
}

impl TimeoutConfig {
    /// Create a new timeout configuration
    pub fn new(seconds: u64, operation: impl Into<String>) -> Self {
        Self::from_duration(Duration::from_secs(seconds), operation)
    }

    pub fn from_duration(duration: Duration, operation: impl Into<String>) -> Self {
        Self {
            duration,
            log_warnings: true,
            operation_name: operation.into(),
        }
    }
}

/// Execute an async operation with a timeout
pub async fn with_timeout<T, F>(config: TimeoutConfig, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    debug!(
        "Starting operation '{}' with timeout of {}s",
        config.operation_name,
        config.duration.as_secs()
    );

    match timeout(config.duration, future).await {
        Ok(result) => result,
        Err(_) => {
            if config.log_warnings {
                error!(
                    "Operation '{}' timed out after {}s",
                    config.operation_name,
                    config.duration.as_secs()
                );
            }
            Err(MalscopeError::Timeout {
                seconds: config.duration.as_secs(),
            })
        }
    }
}

/// Await `future` for at most `budget`; None (with a warning) on overrun.
pub async fn within<T, F>(budget: Duration, what: &str, future: F) -> Option<T>
where
    F: Future<Output = T>,
{
    match timeout(budget, future).await {
        Ok(v) => Some(v),
        Err(_) => {
            warn!("'{}' did not finish within {:?}; abandoning", what, budget);
            None
        }
    }
}

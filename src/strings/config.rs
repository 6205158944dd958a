//! Configuration for string extraction and indicator sampling.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StringsConfig {
    /// Minimum length for a string candidate (in characters)
    pub min_length: usize,
    /// Maximum number of distinct strings kept in the report
    pub max_strings: usize,
    /// Maximum number of distinct sample values kept per indicator kind
    pub max_indicator_samples: usize,
}

impl Default for StringsConfig {
    fn default() -> Self {
        Self {
            min_length: 4,
            max_strings: 100,
            max_indicator_samples: 5,
        }
    }
}

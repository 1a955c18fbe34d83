//! Batch scheduling configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How batches are split and paced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Targets probed concurrently in one group
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Pause between consecutive groups
    #[serde(default = "default_inter_batch_delay_ms")]
    pub inter_batch_delay_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            inter_batch_delay_ms: default_inter_batch_delay_ms(),
        }
    }
}

impl BatchConfig {
    /// Set the group size. Zero is treated as one.
    #[must_use]
    pub const fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the pause between groups
    #[must_use]
    pub fn inter_batch_delay(mut self, delay: Duration) -> Self {
        self.inter_batch_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Group size actually used for chunking
    #[must_use]
    pub const fn group_size(&self) -> usize {
        if self.concurrency == 0 {
            1
        } else {
            self.concurrency
        }
    }

    /// Pause between groups
    #[must_use]
    pub const fn delay(&self) -> Duration {
        Duration::from_millis(self.inter_batch_delay_ms)
    }
}

const fn default_concurrency() -> usize {
    3
}

const fn default_inter_batch_delay_ms() -> u64 {
    500
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = BatchConfig::default();
        assert_eq!(config.concurrency, 3);
        assert_eq!(config.delay(), Duration::from_millis(500));
    }

    #[test]
    fn zero_concurrency_still_makes_progress() {
        assert_eq!(BatchConfig::default().concurrency(0).group_size(), 1);
    }

    #[test]
    fn partial_deserialization() {
        let config: BatchConfig = serde_json::from_str(r#"{"concurrency": 8}"#).unwrap();
        assert_eq!(config.group_size(), 8);
        assert_eq!(config.inter_batch_delay_ms, 500);
    }
}

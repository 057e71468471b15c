//! Lookup tuning

use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_POLL_INTERVAL_MS: u64 = 20;

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

/// Settings for a [`CapabilityLookup`](crate::CapabilityLookup).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupConfig {
    /// Delay between registry queries while waiting, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl LookupConfig {
    pub fn with_poll_interval(interval: Duration) -> Self {
        Self {
            poll_interval_ms: interval.as_millis().try_into().unwrap_or(u64::MAX),
        }
    }

    /// Poll interval, never shorter than one millisecond.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

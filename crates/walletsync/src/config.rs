//! Engine configuration
//!
//! All thresholds the sync core uses are configuration, not hard-coded call
//! sites. Defaults carry the backend's documented constants.

use std::time::Duration;

/// Tunables for the balance engine and send pipeline.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Refresh intervals by failure count: healthy, after 1 failure, after 2+
    pub refresh_intervals: [Duration; 3],
    /// Consecutive failures at which the refresh loop suspends entirely
    pub failure_threshold: u32,
    /// Consecutive failures at which new gateway calls stop being initiated
    pub degraded_threshold: u32,
    /// Native-asset amount that must remain unspent to cover gas
    pub gas_reserve: f64,
    /// Artificial pause before the send pipeline reports success
    pub success_delay: Duration,
    /// Delay before re-syncing balances after a completed send
    pub post_send_resync: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            refresh_intervals: [
                Duration::from_secs(15),
                Duration::from_secs(30),
                Duration::from_secs(60),
            ],
            failure_threshold: 3,
            degraded_threshold: 2,
            gas_reserve: 0.01,
            success_delay: Duration::from_millis(1500),
            post_send_resync: Duration::from_millis(500),
        }
    }
}

impl SyncConfig {
    /// Create a config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the refresh interval ladder
    pub fn with_refresh_intervals(mut self, intervals: [Duration; 3]) -> Self {
        self.refresh_intervals = intervals;
        self
    }

    /// Set the failure count at which the refresh loop suspends
    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    /// Set the failure count at which gateway calls stop being initiated
    pub fn with_degraded_threshold(mut self, threshold: u32) -> Self {
        self.degraded_threshold = threshold;
        self
    }

    /// Set the native-asset gas reserve
    pub fn with_gas_reserve(mut self, reserve: f64) -> Self {
        self.gas_reserve = reserve;
        self
    }

    /// Set the artificial success delay
    pub fn with_success_delay(mut self, delay: Duration) -> Self {
        self.success_delay = delay;
        self
    }

    /// Set the post-send resync delay
    pub fn with_post_send_resync(mut self, delay: Duration) -> Self {
        self.post_send_resync = delay;
        self
    }

    /// Refresh interval for the given consecutive-failure count.
    pub fn interval_for(&self, failures: u32) -> Duration {
        match failures {
            0 => self.refresh_intervals[0],
            1 => self.refresh_intervals[1],
            _ => self.refresh_intervals[2],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_ladder() {
        let config = SyncConfig::default();
        assert_eq!(config.interval_for(0), Duration::from_secs(15));
        assert_eq!(config.interval_for(1), Duration::from_secs(30));
        assert_eq!(config.interval_for(2), Duration::from_secs(60));
        assert_eq!(config.interval_for(3), Duration::from_secs(60));
    }
}

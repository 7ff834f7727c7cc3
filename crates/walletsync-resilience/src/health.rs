//! Network health tracking
//!
//! Tracks whether the remote API is considered reachable and decides when a
//! call should be skipped in favor of cached data. A single success fully
//! resets the failed state; after the retry window elapses the next attempt
//! is permitted as a recovery probe.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// Execution context the tracker is running in.
///
/// Extension calls are never skipped: the extension's transport layer has its
/// own retry path and a stricter freshness requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallContext {
    /// Direct web fetches (default)
    #[default]
    Web,
    /// Browser-extension background transport
    Extension,
}

/// Configuration for the network health tracker
#[derive(Debug, Clone)]
pub struct NetworkHealthConfig {
    /// Cool-down before a recovery probe is allowed after a failure
    pub retry_window: Duration,
    /// Execution context
    pub context: CallContext,
    /// External "is the transport available at all" signal. Stands in for the
    /// browser online/offline flag; owned by the composition root.
    pub offline: Arc<AtomicBool>,
}

impl Default for NetworkHealthConfig {
    fn default() -> Self {
        Self {
            retry_window: Duration::from_secs(5 * 60),
            context: CallContext::Web,
            offline: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl NetworkHealthConfig {
    /// Create a new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the retry window
    pub fn with_retry_window(mut self, window: Duration) -> Self {
        self.retry_window = window;
        self
    }

    /// Set the execution context
    pub fn with_context(mut self, context: CallContext) -> Self {
        self.context = context;
        self
    }

    /// Inject an offline signal
    pub fn with_offline_flag(mut self, offline: Arc<AtomicBool>) -> Self {
        self.offline = offline;
        self
    }
}

/// Tracks backend reachability and gates outbound calls.
///
/// Shared as `Arc<NetworkHealth>` between the gateway, directory and engine.
#[derive(Debug)]
pub struct NetworkHealth {
    config: NetworkHealthConfig,
    failed: AtomicBool,
    failed_at: Mutex<Option<Instant>>,
}

impl NetworkHealth {
    /// Create a tracker with the given config
    pub fn new(config: NetworkHealthConfig) -> Self {
        Self {
            config,
            failed: AtomicBool::new(false),
            failed_at: Mutex::new(None),
        }
    }

    /// Web-context tracker with default thresholds
    pub fn default_web() -> Self {
        Self::new(NetworkHealthConfig::default())
    }

    /// Extension-context tracker: calls are never skipped, and any failed
    /// state carried over from a previous session is cleared on start-up.
    pub fn extension() -> Self {
        let health = Self::new(
            NetworkHealthConfig::default().with_context(CallContext::Extension),
        );
        health.clear();
        health
    }

    /// Record a failed backend call.
    pub fn mark_failed(&self) {
        self.failed.store(true, Ordering::SeqCst);
        *self.failed_at.lock().expect("health lock poisoned") = Some(Instant::now());
        tracing::warn!(
            retry_window_secs = self.config.retry_window.as_secs(),
            "backend marked unreachable"
        );
    }

    /// Record a successful backend call. Any single success fully resets the
    /// failed state; there is no gradual recovery.
    pub fn mark_working(&self) {
        if self.failed.swap(false, Ordering::SeqCst) {
            tracing::info!("backend marked working again");
        }
        *self.failed_at.lock().expect("health lock poisoned") = None;
    }

    /// Clear the failed state without logging a recovery (start-up reset).
    pub fn clear(&self) {
        self.failed.store(false, Ordering::SeqCst);
        *self.failed_at.lock().expect("health lock poisoned") = None;
    }

    /// Whether the next call should be skipped in favor of cached data.
    ///
    /// True when offline, or when a failure was recorded and the retry window
    /// has not yet elapsed. Always false in the extension context.
    pub fn should_skip(&self) -> bool {
        if self.config.context == CallContext::Extension {
            return false;
        }
        if self.config.offline.load(Ordering::SeqCst) {
            return true;
        }
        if !self.failed.load(Ordering::SeqCst) {
            return false;
        }
        match *self.failed_at.lock().expect("health lock poisoned") {
            // Window elapsed: allow the next attempt as a recovery probe. The
            // failed flag stays set until a call actually succeeds.
            Some(at) => at.elapsed() <= self.config.retry_window,
            None => false,
        }
    }

    /// Whether a failure is currently recorded (independent of the window).
    pub fn is_failed(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }

    /// When the last failure was recorded, if any.
    pub fn failed_at(&self) -> Option<Instant> {
        *self.failed_at.lock().expect("health lock poisoned")
    }

    /// The context this tracker was configured for.
    pub fn context(&self) -> CallContext {
        self.config.context
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_unfailed() {
        let health = NetworkHealth::default_web();
        assert!(!health.is_failed());
        assert!(!health.should_skip());
    }

    #[tokio::test]
    async fn test_mark_failed_skips_immediately() {
        let health = NetworkHealth::default_web();
        health.mark_failed();
        assert!(health.is_failed());
        assert!(health.should_skip());
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_elapse_allows_probe() {
        let health = NetworkHealth::new(
            NetworkHealthConfig::new().with_retry_window(Duration::from_secs(300)),
        );
        health.mark_failed();
        assert!(health.should_skip());

        tokio::time::advance(Duration::from_secs(301)).await;
        // Probe allowed, but the failure is still on record until a success.
        assert!(!health.should_skip());
        assert!(health.is_failed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_mark_working_resets_regardless_of_elapsed() {
        let health = NetworkHealth::default_web();
        health.mark_failed();
        tokio::time::advance(Duration::from_secs(1)).await;

        health.mark_working();
        assert!(!health.is_failed());
        assert!(!health.should_skip());
        assert!(health.failed_at().is_none());
    }

    #[tokio::test]
    async fn test_extension_never_skips() {
        let health = NetworkHealth::extension();
        health.mark_failed();
        assert!(!health.should_skip());
    }

    #[test]
    fn test_offline_flag_forces_skip() {
        let offline = Arc::new(AtomicBool::new(false));
        let health = NetworkHealth::new(
            NetworkHealthConfig::new().with_offline_flag(offline.clone()),
        );
        assert!(!health.should_skip());

        offline.store(true, Ordering::SeqCst);
        assert!(health.should_skip());

        offline.store(false, Ordering::SeqCst);
        assert!(!health.should_skip());
    }

    #[test]
    fn test_clear_is_silent_reset() {
        let health = NetworkHealth::default_web();
        health.mark_failed();
        health.clear();
        assert!(!health.is_failed());
        assert!(health.failed_at().is_none());
    }
}

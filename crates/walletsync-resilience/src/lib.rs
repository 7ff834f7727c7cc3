//! # walletsync-resilience
//!
//! Resilience primitives for the walletsync SDK:
//!
//! - **Network Health Tracker**: a process-wide (but injectable, never global)
//!   flag recording whether the remote backend is currently considered
//!   reachable, with a cool-down window before retry probes are allowed.
//! - **Exponential Backoff**: retry delays that grow exponentially, plus an
//!   executor that retries only errors classified as transient.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use walletsync_resilience::{BackoffConfig, NetworkHealth, retry_with_backoff};
//!
//! # async fn example() -> walletsync_error::Result<()> {
//! let health = NetworkHealth::default_web();
//!
//! if !health.should_skip() {
//!     let result = retry_with_backoff(&BackoffConfig::gateway(), || async {
//!         // your request here
//!         Ok::<_, walletsync_error::SyncError>(42)
//!     })
//!     .await;
//!     match result {
//!         Ok(_) => health.mark_working(),
//!         Err(_) => health.mark_failed(),
//!     }
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod backoff;
pub mod health;

pub use backoff::{retry_with_backoff, BackoffConfig, ExponentialBackoff};
pub use health::{CallContext, NetworkHealth, NetworkHealthConfig};

//! # walletsync-error
//!
//! Unified error types for the walletsync SDK. Every public operation in the
//! gateway, directory, engine and send pipeline surfaces failures through
//! [`SyncError`]; nothing panics or throws raw transport errors across a
//! component boundary.
//!
//! ## Error Categories
//!
//! - Skip decisions ([`SyncError::Skipped`]): the health tracker refused the
//!   call before any I/O happened; callers fall back to cached data without
//!   counting it as a fresh failure.
//! - Transient transport failures: timeouts and connection errors, retried
//!   with backoff at the gateway layer.
//! - Deterministic rejections ([`SyncError::Http`]): non-2xx responses with a
//!   parsed body, never retried.
//! - Validation failures: local and synchronous, never reach the network.
//!
//! ## Example
//!
//! ```
//! use walletsync_error::{Result, SyncError};
//!
//! fn require_recipient(addr: &str) -> Result<()> {
//!     if addr.is_empty() {
//!         return Err(SyncError::AddressRequired);
//!     }
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use thiserror::Error;

/// The main error type for walletsync operations.
#[derive(Error, Debug)]
pub enum SyncError {
    // ============ Skip / breaker decisions ============
    /// The network health tracker refused the call before any I/O.
    ///
    /// Distinguishable from a real failure: callers fall back to the cache or
    /// fallback store and must not count this as a fresh failure.
    #[error("call skipped: backend marked unreachable")]
    Skipped,

    // ============ Transient transport failures ============
    /// Request timed out before a response arrived.
    #[error("request timed out after {seconds}s")]
    Timeout {
        /// Configured timeout that elapsed
        seconds: u64,
    },

    /// Connection-level failure (refused, reset, DNS, aborted).
    #[error("transport error: {0}")]
    Transport(String),

    /// The transport retry budget is exhausted.
    #[error("all {attempts} attempts failed; last error: {last}")]
    RetriesExhausted {
        /// Attempts made, including the initial one
        attempts: u32,
        /// Display form of the last transport error
        last: String,
    },

    // ============ Deterministic rejections ============
    /// Non-2xx HTTP response. Not retried.
    #[error("HTTP {status}: {message}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Error message from the response body, or the status text
        message: String,
    },

    // ============ Validation failures (local, synchronous) ============
    /// Recipient address field is empty.
    #[error("please input address")]
    AddressRequired,

    /// Recipient address does not match any accepted format.
    #[error("invalid recipient address: {0}")]
    InvalidAddress(String),

    /// Amount field is empty.
    #[error("please enter an amount")]
    AmountRequired,

    /// Amount is not a positive number.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Amount exceeds the spendable balance.
    #[error("insufficient balance: have {have}, need {need}")]
    InsufficientBalance {
        /// Spendable balance (after any gas reserve)
        have: f64,
        /// Requested amount
        need: f64,
    },

    // ============ Lookup / state ============
    /// Wallet id not present in the directory or backend.
    #[error("wallet not found: {0}")]
    WalletNotFound(String),

    /// Operation not valid in the pipeline's current state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    // ============ Local persistence ============
    /// Cache store read/write failure.
    #[error("cache error: {0}")]
    Cache(String),

    /// JSON encode/decode failure.
    #[error("json error: {0}")]
    Json(String),

    // ============ Generic ============
    /// Anything else.
    #[error("{0}")]
    Other(String),
}

/// Convenient Result type using SyncError
pub type Result<T> = std::result::Result<T, SyncError>;

impl SyncError {
    /// Returns true if the gateway should retry this error with backoff.
    ///
    /// Only transport-level failures are transient; HTTP rejections are
    /// deterministic and validation errors never reach the network.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::Timeout { .. } | SyncError::Transport(_))
    }

    /// Returns true if this is a skip decision rather than a real failure.
    pub fn is_skip(&self) -> bool {
        matches!(self, SyncError::Skipped)
    }

    /// Returns true for the local validation family (send form stage).
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            SyncError::AddressRequired
                | SyncError::InvalidAddress(_)
                | SyncError::AmountRequired
                | SyncError::InvalidAmount(_)
                | SyncError::InsufficientBalance { .. }
        )
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Json(err.to_string())
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::Cache(err.to_string())
    }
}

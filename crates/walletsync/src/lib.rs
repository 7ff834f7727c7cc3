//! # walletsync
//!
//! Client-side real-time balance synchronization with optimistic updates.
//!
//! The crate keeps a local view of wallet balances continuously reconciled
//! against a remote backend while staying responsive when that backend is
//! slow, flaky or down:
//!
//! - **Wallet Directory**: the wallet list and selection, with cache fallback
//!   and default-wallet synthesis so consumers always have data.
//! - **Balance Synchronization Engine**: per-(wallet, asset) balances,
//!   synchronous optimistic writes with subscriber fan-out, failure-aware
//!   batch refresh and a background refresh loop.
//! - **Transaction Submission Pipeline**: validation, confirmation and
//!   submission of a send, with the optimistic debit applied before the
//!   network round-trip.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use walletsync::{MemoryCache, SyncConfig, WalletHub};
//! use walletsync_gateway::MemoryBackend;
//! use walletsync_resilience::NetworkHealth;
//!
//! # async fn example() -> walletsync_error::Result<()> {
//! let hub = WalletHub::new(
//!     Arc::new(MemoryBackend::new()),
//!     Arc::new(MemoryCache::new()),
//!     Arc::new(NetworkHealth::default_web()),
//!     SyncConfig::default(),
//! );
//!
//! let wallets = hub.directory.refresh().await;
//! hub.engine.refresh_all(&wallets).await;
//! let _loop = hub.spawn_refresh_loop();
//!
//! let selected = hub.directory.selected().await.ok_or_else(|| {
//!     walletsync_error::SyncError::Other("no wallet".into())
//! })?;
//! println!("eth: {}", hub.engine.get_balance(&selected.id, "eth"));
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cache;
pub mod config;
pub mod directory;
pub mod engine;
pub mod model;
pub mod prices;
pub mod send;

pub use cache::{CacheStore, FileCache, MemoryCache};
pub use config::SyncConfig;
pub use directory::WalletDirectory;
pub use engine::{BalanceEngine, RefreshHandle, Subscription};
pub use model::{
    ChainNetwork, Transaction, TxDirection, TxStatus, Wallet, WalletKind,
};
pub use prices::{DemoPrices, PriceSource};
pub use send::{SendPipeline, SendState};

use std::sync::Arc;
use walletsync_gateway::WalletBackend;
use walletsync_resilience::NetworkHealth;

/// Composition root wiring the backend, cache, health tracker, directory and
/// engine together.
pub struct WalletHub {
    /// Shared network health tracker
    pub health: Arc<NetworkHealth>,
    /// The backend all components talk to
    pub backend: Arc<dyn WalletBackend>,
    /// Wallet list and selection
    pub directory: Arc<WalletDirectory>,
    /// Balance state and refresh machinery
    pub engine: BalanceEngine,
    config: SyncConfig,
}

impl WalletHub {
    /// Wire up a hub over the given backend, cache and health tracker.
    pub fn new(
        backend: Arc<dyn WalletBackend>,
        cache: Arc<dyn CacheStore>,
        health: Arc<NetworkHealth>,
        config: SyncConfig,
    ) -> Self {
        let directory = Arc::new(WalletDirectory::new(Arc::clone(&backend), cache));
        let engine = BalanceEngine::new(Arc::clone(&backend), Arc::clone(&health), config.clone());
        Self {
            health,
            backend,
            directory,
            engine,
            config,
        }
    }

    /// Fresh send pipeline bound to this hub's engine and backend.
    pub fn send_pipeline(&self) -> SendPipeline {
        SendPipeline::new(
            self.engine.clone(),
            Arc::clone(&self.backend),
            self.config.clone(),
        )
    }

    /// Start the background balance refresh loop.
    pub fn spawn_refresh_loop(&self) -> RefreshHandle {
        self.engine.spawn_refresh_loop(Arc::clone(&self.directory))
    }

    /// Whether the app is running on cached/optimistic data instead of live
    /// backend truth. Drives the "offline/demo mode" indicator; the sync core
    /// itself never consults it.
    ///
    /// True when the engine's last gateway interaction failed, or when the
    /// backend health probe is unreachable or reports itself degraded.
    pub async fn demo_mode(&self) -> bool {
        if !self.engine.online() {
            return true;
        }
        match self.backend.health().await {
            Ok(health) => !health.is_ok(),
            Err(e) => {
                if !e.is_skip() {
                    tracing::debug!(error = %e, "health probe failed");
                }
                true
            }
        }
    }
}

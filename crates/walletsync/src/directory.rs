//! Wallet directory
//!
//! Owns the wallet list and the current selection. Refreshing prefers the
//! gateway, falls back to the local cache, and as a last resort synthesizes a
//! default wallet so consumers always have something to show. Every mutation
//! writes through to the cache immediately.

use crate::cache::CacheStore;
use crate::model::{random_demo_balances, ChainNetwork, Transaction, Wallet, WalletKind};
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use walletsync_error::{Result, SyncError};
use walletsync_gateway::{CreateWalletBody, WalletBackend};

/// The wallet directory. Share as `Arc<WalletDirectory>`.
pub struct WalletDirectory {
    backend: Arc<dyn WalletBackend>,
    cache: Arc<dyn CacheStore>,
    state: RwLock<Vec<Wallet>>,
    selection: watch::Sender<Option<String>>,
}

impl WalletDirectory {
    /// Create an empty directory over the given backend and cache.
    pub fn new(backend: Arc<dyn WalletBackend>, cache: Arc<dyn CacheStore>) -> Self {
        let (selection, _) = watch::channel(None);
        Self {
            backend,
            cache,
            state: RwLock::new(Vec::new()),
            selection,
        }
    }

    /// Current wallet list snapshot.
    pub async fn wallets(&self) -> Vec<Wallet> {
        self.state.read().await.clone()
    }

    /// The currently selected wallet, if any.
    pub async fn selected(&self) -> Option<Wallet> {
        self.state.read().await.iter().find(|w| w.is_selected).cloned()
    }

    /// Watch the selected wallet id. Receivers see the id change whenever the
    /// selection moves.
    pub fn subscribe_selection(&self) -> watch::Receiver<Option<String>> {
        self.selection.subscribe()
    }

    /// Refresh the wallet list, best-effort.
    ///
    /// After this returns the directory is non-empty and exactly one wallet
    /// is selected.
    pub async fn refresh(&self) -> Vec<Wallet> {
        let fetched = match self.backend.list_wallets(None).await {
            Ok(list) if !list.is_empty() => Some(list),
            Ok(_) => {
                tracing::info!("backend returned no wallets, seeding");
                match self.backend.seed().await {
                    Ok(()) => self
                        .backend
                        .list_wallets(None)
                        .await
                        .ok()
                        .filter(|list| !list.is_empty()),
                    Err(e) => {
                        tracing::warn!(error = %e, "seed failed");
                        None
                    }
                }
            }
            Err(e) => {
                if !e.is_skip() {
                    tracing::warn!(error = %e, "wallet list fetch failed, using cache");
                }
                return self.adopt_fallback().await;
            }
        };

        match fetched {
            Some(list) => {
                let wallets = list.into_iter().map(Wallet::from_wire).collect();
                self.adopt(wallets).await
            }
            None => self.adopt(vec![synthesize_default()]).await,
        }
    }

    /// Mark exactly the given wallet selected.
    pub async fn select(&self, id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.iter().any(|w| w.id == id) {
            return Err(SyncError::WalletNotFound(id.to_string()));
        }
        for wallet in state.iter_mut() {
            wallet.is_selected = wallet.id == id;
        }
        self.cache.save_wallets(&state)?;
        self.cache.save_selected(id)?;
        self.publish_selection(Some(id.to_string()));
        Ok(())
    }

    /// Add a wallet with generated placeholder key material.
    ///
    /// Tries the gateway first; on failure keeps a local copy with randomized
    /// demo balances. The new wallet becomes selected only when it is the
    /// first one in the directory.
    pub async fn add(&self, name: &str, kind: WalletKind, network: ChainNetwork) -> Wallet {
        let draft = Wallet::new(name, kind, network);
        let body = CreateWalletBody {
            name: name.to_string(),
            kind: kind.as_str().to_string(),
            address: draft.address.clone(),
            public_key: draft.public_key.clone(),
            network: network.as_str().to_string(),
            mnemonic: None,
            private_key: None,
        };

        let mut wallet = match self.backend.create_wallet(&body).await {
            Ok(wire) => Wallet::from_wire(wire),
            Err(e) => {
                tracing::warn!(error = %e, "remote wallet creation failed, keeping local copy");
                let mut wallet = draft;
                wallet.balances = random_demo_balances();
                wallet
            }
        };

        let mut state = self.state.write().await;
        let first = state.is_empty();
        wallet.is_selected = first;
        state.push(wallet.clone());
        if let Err(e) = self.cache.save_wallets(&state) {
            tracing::warn!(error = %e, "cache write failed");
        }
        if first {
            if let Err(e) = self.cache.save_selected(&wallet.id) {
                tracing::warn!(error = %e, "cache write failed");
            }
            self.publish_selection(Some(wallet.id.clone()));
        }
        wallet
    }

    /// Transaction history for a wallet. Total unavailability yields an empty
    /// list, never an error.
    pub async fn transactions(&self, wallet_id: &str, limit: Option<u32>) -> Vec<Transaction> {
        match self.backend.list_transactions(wallet_id, limit).await {
            Ok(list) => list.into_iter().map(Transaction::from_wire).collect(),
            Err(e) => {
                if !e.is_skip() {
                    tracing::warn!(wallet = %wallet_id, error = %e, "transaction fetch failed");
                }
                Vec::new()
            }
        }
    }

    async fn adopt_fallback(&self) -> Vec<Wallet> {
        let cached = self.cache.load_wallets().ok().flatten();
        match cached {
            Some(wallets) if !wallets.is_empty() => self.adopt(wallets).await,
            _ => self.adopt(vec![synthesize_default()]).await,
        }
    }

    /// Install a new wallet list, re-deriving the selection and persisting
    /// only when the list structurally changed.
    async fn adopt(&self, mut incoming: Vec<Wallet>) -> Vec<Wallet> {
        let mut state = self.state.write().await;

        let previous = state
            .iter()
            .find(|w| w.is_selected)
            .map(|w| w.id.clone())
            .or_else(|| self.cache.load_selected().ok().flatten());
        let chosen = previous
            .filter(|id| incoming.iter().any(|w| &w.id == id))
            .or_else(|| incoming.first().map(|w| w.id.clone()));
        for wallet in incoming.iter_mut() {
            wallet.is_selected = Some(&wallet.id) == chosen.as_ref();
        }

        if *state != incoming {
            *state = incoming;
            if let Err(e) = self.cache.save_wallets(&state) {
                tracing::warn!(error = %e, "cache write failed");
            }
            if let Some(id) = &chosen {
                if let Err(e) = self.cache.save_selected(id) {
                    tracing::warn!(error = %e, "cache write failed");
                }
            }
            self.publish_selection(chosen);
        }
        state.clone()
    }

    fn publish_selection(&self, id: Option<String>) {
        self.selection.send_if_modified(|current| {
            if *current != id {
                *current = id;
                true
            } else {
                false
            }
        });
    }
}

fn synthesize_default() -> Wallet {
    let mut wallet = Wallet::new("My Wallet", WalletKind::Native, ChainNetwork::Ethereum);
    wallet.balances = random_demo_balances();
    tracing::info!(wallet = %wallet.id, "synthesized default wallet");
    wallet
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use walletsync_gateway::MemoryBackend;

    fn directory(backend: MemoryBackend) -> WalletDirectory {
        WalletDirectory::new(Arc::new(backend), Arc::new(MemoryCache::new()))
    }

    fn selected_count(wallets: &[Wallet]) -> usize {
        wallets.iter().filter(|w| w.is_selected).count()
    }

    #[tokio::test]
    async fn test_refresh_adopts_backend_wallets() {
        let dir = directory(MemoryBackend::new());
        let wallets = dir.refresh().await;

        assert_eq!(wallets.len(), 1);
        assert_eq!(wallets[0].id, "wallet_1");
        assert_eq!(selected_count(&wallets), 1);
    }

    #[tokio::test]
    async fn test_refresh_falls_back_to_cache() {
        let backend = MemoryBackend::new();
        let cache = Arc::new(MemoryCache::new());
        let dir = WalletDirectory::new(Arc::new(backend.clone()), cache.clone());

        dir.refresh().await;
        backend.set_failing(true);
        let wallets = dir.refresh().await;

        assert_eq!(wallets.len(), 1);
        assert_eq!(wallets[0].id, "wallet_1");
        assert_eq!(selected_count(&wallets), 1);
    }

    #[tokio::test]
    async fn test_refresh_synthesizes_default_when_everything_fails() {
        let backend = MemoryBackend::new();
        backend.set_failing(true);
        let dir = directory(backend);

        let wallets = dir.refresh().await;
        assert_eq!(wallets.len(), 1);
        assert!(!wallets[0].balances.is_empty());
        assert_eq!(selected_count(&wallets), 1);
    }

    #[tokio::test]
    async fn test_empty_backend_is_seeded() {
        let dir = directory(MemoryBackend::empty());
        let wallets = dir.refresh().await;

        assert_eq!(wallets.len(), 1);
        assert_eq!(wallets[0].id, "wallet_1");
    }

    #[tokio::test]
    async fn test_select_moves_the_single_flag() {
        let dir = directory(MemoryBackend::new());
        dir.refresh().await;
        let second = dir.add("Second", WalletKind::Native, ChainNetwork::Bsc).await;

        dir.select(&second.id).await.unwrap();
        let wallets = dir.wallets().await;
        assert_eq!(selected_count(&wallets), 1);
        assert_eq!(dir.selected().await.unwrap().id, second.id);

        assert!(matches!(
            dir.select("nope").await,
            Err(SyncError::WalletNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_selection_survives_refresh() {
        let dir = directory(MemoryBackend::new());
        dir.refresh().await;
        let second = dir.add("Second", WalletKind::Native, ChainNetwork::Bsc).await;
        dir.select(&second.id).await.unwrap();

        let wallets = dir.refresh().await;
        assert_eq!(selected_count(&wallets), 1);
        // The second wallet only exists remotely too, so it survives.
        assert_eq!(dir.selected().await.unwrap().id, second.id);
    }

    #[tokio::test]
    async fn test_add_offline_keeps_local_copy_with_demo_balances() {
        let backend = MemoryBackend::new();
        let dir = directory(backend.clone());
        dir.refresh().await;

        backend.set_failing(true);
        let wallet = dir.add("Offline", WalletKind::Imported, ChainNetwork::Tron).await;

        assert!(!wallet.balances.is_empty());
        // Not the first wallet, so not selected.
        assert!(!wallet.is_selected);
        assert_eq!(dir.wallets().await.len(), 2);
    }

    #[tokio::test]
    async fn test_first_added_wallet_is_selected() {
        let backend = MemoryBackend::empty();
        backend.set_failing(true);
        let dir = directory(backend);

        let wallet = dir.add("Only", WalletKind::Native, ChainNetwork::Ethereum).await;
        assert!(wallet.is_selected);
    }

    #[tokio::test]
    async fn test_selection_watch_fires_on_change() {
        let dir = directory(MemoryBackend::new());
        let mut rx = dir.subscribe_selection();

        dir.refresh().await;
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().as_deref(), Some("wallet_1"));
    }

    #[tokio::test]
    async fn test_transactions_empty_on_total_failure() {
        let backend = MemoryBackend::new();
        backend.set_failing(true);
        let dir = directory(backend);

        assert!(dir.transactions("wallet_1", None).await.is_empty());
    }
}

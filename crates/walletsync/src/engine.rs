//! Balance synchronization engine
//!
//! The state machine at the center of the crate: per-(wallet, asset) balances
//! with optimistic writes, a publish/subscribe registry keyed by the same
//! pair, failure-aware batch refresh, and a background loop whose interval
//! stretches as consecutive failures accumulate.
//!
//! Optimistic writes are synchronous: the new value is visible to
//! [`BalanceEngine::get_balance`] and all subscribers have been notified
//! before the call returns, ahead of any network round-trip. A failed durable
//! write never rolls the optimistic value back; the engine only degrades its
//! own willingness to keep calling the gateway.

use crate::config::SyncConfig;
use crate::directory::WalletDirectory;
use crate::model::Wallet;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use walletsync_gateway::WalletBackend;
use walletsync_resilience::NetworkHealth;

type Key = (String, String);
type Callback = Arc<dyn Fn(f64) + Send + Sync>;

struct EngineInner {
    config: SyncConfig,
    backend: Arc<dyn WalletBackend>,
    health: Arc<NetworkHealth>,
    balances: DashMap<Key, f64>,
    last_change: DashMap<Key, DateTime<Utc>>,
    subscribers: DashMap<Key, Vec<(u64, Callback)>>,
    next_subscriber_id: AtomicU64,
    consecutive_failures: AtomicU32,
    online: AtomicBool,
    refresh_notify: Notify,
    force_refresh: AtomicBool,
}

impl EngineInner {
    fn key(wallet_id: &str, asset: &str) -> Key {
        (wallet_id.to_string(), asset.to_string())
    }

    /// Invoke every subscriber for a key. Callbacks are cloned out of the map
    /// first so none of them runs while a shard lock is held.
    fn notify(&self, key: &Key, value: f64) {
        let callbacks: Vec<Callback> = match self.subscribers.get(key) {
            Some(entry) => entry.iter().map(|(_, cb)| Arc::clone(cb)).collect(),
            None => return,
        };
        for callback in callbacks {
            callback(value);
        }
    }

    fn record_failure(&self) {
        let cap = self.config.failure_threshold;
        let _ = self
            .consecutive_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                Some((n + 1).min(cap))
            });
        self.online.store(false, Ordering::SeqCst);
    }

    fn record_success(&self) {
        self.consecutive_failures.store(0, Ordering::SeqCst);
        self.online.store(true, Ordering::SeqCst);
    }
}

/// Cheaply cloneable handle to the shared engine state.
#[derive(Clone)]
pub struct BalanceEngine {
    inner: Arc<EngineInner>,
}

/// RAII guard for a balance subscription; dropping it unsubscribes.
pub struct Subscription {
    key: Key,
    id: u64,
    engine: Weak<EngineInner>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.engine.upgrade() {
            if let Some(mut entry) = inner.subscribers.get_mut(&self.key) {
                entry.retain(|(id, _)| *id != self.id);
                if entry.is_empty() {
                    drop(entry);
                    inner
                        .subscribers
                        .remove_if(&self.key, |_, callbacks| callbacks.is_empty());
                }
            }
        }
    }
}

/// Background refresh loop handle; dropping it stops the loop.
pub struct RefreshHandle {
    handle: JoinHandle<()>,
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl BalanceEngine {
    /// Create an engine over the given backend and health tracker.
    pub fn new(
        backend: Arc<dyn WalletBackend>,
        health: Arc<NetworkHealth>,
        config: SyncConfig,
    ) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                config,
                backend,
                health,
                balances: DashMap::new(),
                last_change: DashMap::new(),
                subscribers: DashMap::new(),
                next_subscriber_id: AtomicU64::new(1),
                consecutive_failures: AtomicU32::new(0),
                online: AtomicBool::new(true),
                refresh_notify: Notify::new(),
                force_refresh: AtomicBool::new(false),
            }),
        }
    }

    /// Current balance for a (wallet, asset) pair, 0 when unknown.
    pub fn get_balance(&self, wallet_id: &str, asset: &str) -> f64 {
        self.inner
            .balances
            .get(&EngineInner::key(wallet_id, asset))
            .map(|v| *v)
            .unwrap_or(0.0)
    }

    /// When the pair's value last changed, for UI flash timing. Advisory only.
    pub fn last_change(&self, wallet_id: &str, asset: &str) -> Option<DateTime<Utc>> {
        self.inner
            .last_change
            .get(&EngineInner::key(wallet_id, asset))
            .map(|v| *v)
    }

    /// Whether the last gateway interaction succeeded.
    pub fn online(&self) -> bool {
        self.inner.online.load(Ordering::SeqCst)
    }

    /// Consecutive gateway failures, capped at the configured threshold.
    pub fn consecutive_failures(&self) -> u32 {
        self.inner.consecutive_failures.load(Ordering::SeqCst)
    }

    /// Subscribe to changes of one (wallet, asset) pair. The callback runs on
    /// whichever task performs the write. Multiple subscribers per pair are
    /// allowed; the returned guard removes exactly this one.
    pub fn subscribe(
        &self,
        wallet_id: &str,
        asset: &str,
        callback: impl Fn(f64) + Send + Sync + 'static,
    ) -> Subscription {
        let key = EngineInner::key(wallet_id, asset);
        let id = self.inner.next_subscriber_id.fetch_add(1, Ordering::SeqCst);
        self.inner
            .subscribers
            .entry(key.clone())
            .or_default()
            .push((id, Arc::new(callback)));
        Subscription {
            key,
            id,
            engine: Arc::downgrade(&self.inner),
        }
    }

    /// Immediate local write: the value is stored, stamped and all
    /// subscribers notified before this returns. Negative amounts clamp to 0.
    pub fn set_optimistic(&self, wallet_id: &str, asset: &str, amount: f64) {
        let key = EngineInner::key(wallet_id, asset);
        let amount = amount.max(0.0);
        self.inner.balances.insert(key.clone(), amount);
        self.inner.last_change.insert(key.clone(), Utc::now());
        self.inner.notify(&key, amount);
    }

    /// Durable write: optimistic first, then a gateway write unless the
    /// engine is degraded or the health tracker says skip. A gateway failure
    /// does not roll the optimistic value back.
    pub async fn update(&self, wallet_id: &str, asset: &str, amount: f64) {
        self.set_optimistic(wallet_id, asset, amount);

        let failures = self.consecutive_failures();
        if failures >= self.inner.config.degraded_threshold || self.inner.health.should_skip() {
            tracing::debug!(
                wallet = %wallet_id,
                asset = %asset,
                failures,
                "keeping optimistic value, durable write not attempted"
            );
            return;
        }

        match self
            .inner
            .backend
            .update_balance(wallet_id, asset, amount.max(0.0))
            .await
        {
            Ok(()) => self.inner.record_success(),
            Err(e) if e.is_skip() => {}
            Err(e) => {
                tracing::warn!(
                    wallet = %wallet_id,
                    asset = %asset,
                    error = %e,
                    "durable balance write failed, keeping optimistic value"
                );
                self.inner.record_failure();
            }
        }
    }

    /// Batch refresh for a wallet list.
    ///
    /// Every wallet's cached balances are applied as a baseline. Unless the
    /// engine is degraded (or fully saturated), each wallet is then fetched
    /// from the gateway and the authoritative balances win. Per-wallet
    /// failures are logged and swallowed; the loop continues. Subscribers are
    /// notified once per key, only for keys whose value actually changed.
    pub async fn refresh_all(&self, wallets: &[Wallet]) {
        self.refresh_all_inner(wallets, false).await;
    }

    /// Like [`refresh_all`](Self::refresh_all), but probes the gateway even
    /// when the failure counter is saturated. A success resets the counter.
    pub async fn refresh_all_forced(&self, wallets: &[Wallet]) {
        self.refresh_all_inner(wallets, true).await;
    }

    async fn refresh_all_inner(&self, wallets: &[Wallet], force: bool) {
        let failures = self.consecutive_failures();
        let use_gateway = force || failures < self.inner.config.degraded_threshold;
        let mut any_success = false;
        let mut any_failure = false;
        let mut changed: Vec<(Key, f64)> = Vec::new();

        for wallet in wallets {
            let mut balances = wallet.balances.clone();

            if use_gateway && !self.inner.health.should_skip() {
                match self.inner.backend.get_wallet(&wallet.id).await {
                    Ok(wire) => {
                        balances = wire.balance;
                        any_success = true;
                    }
                    Err(e) if e.is_skip() => {}
                    Err(e) => {
                        tracing::warn!(
                            wallet = %wallet.id,
                            error = %e,
                            "balance fetch failed, keeping cached baseline"
                        );
                        any_failure = true;
                    }
                }
            }

            for (asset, amount) in balances {
                let key = (wallet.id.clone(), asset);
                let amount = amount.max(0.0);
                let previous = self.inner.balances.insert(key.clone(), amount);
                if previous != Some(amount) {
                    self.inner.last_change.insert(key.clone(), Utc::now());
                    changed.push((key, amount));
                }
            }
        }

        for (key, value) in &changed {
            self.inner.notify(key, *value);
        }

        if any_success {
            self.inner.record_success();
        } else if any_failure {
            self.inner.record_failure();
        }

        tracing::debug!(
            wallets = wallets.len(),
            changed = changed.len(),
            failures = self.consecutive_failures(),
            "balance refresh finished"
        );
    }

    /// Wake the refresh loop for an immediate pass that probes the gateway
    /// even when the failure counter is saturated.
    pub fn refresh_now(&self) {
        self.inner.force_refresh.store(true, Ordering::SeqCst);
        self.inner.refresh_notify.notify_one();
    }

    /// Spawn the background refresh loop.
    ///
    /// Refreshes immediately, then sleeps 15s while healthy, 30s after one
    /// failure and 60s after two. Once the failure counter saturates the loop
    /// parks until [`refresh_now`](Self::refresh_now) or a wallet-selection
    /// change wakes it. Dropping the returned handle stops the loop.
    pub fn spawn_refresh_loop(&self, directory: Arc<WalletDirectory>) -> RefreshHandle {
        let engine = self.clone();
        let mut selection = directory.subscribe_selection();
        // Swallow the initial value so only real changes wake the loop.
        selection.mark_unchanged();

        let handle = tokio::spawn(async move {
            loop {
                let wallets = directory.wallets().await;
                let force = engine.inner.force_refresh.swap(false, Ordering::SeqCst);
                if force {
                    engine.refresh_all_forced(&wallets).await;
                } else {
                    engine.refresh_all(&wallets).await;
                }

                let failures = engine.consecutive_failures();
                if failures >= engine.inner.config.failure_threshold {
                    tracing::warn!(failures, "refresh loop suspended until manual trigger");
                    tokio::select! {
                        _ = engine.inner.refresh_notify.notified() => {}
                        changed = selection.changed() => {
                            if changed.is_err() {
                                break;
                            }
                        }
                    }
                } else {
                    let interval = engine.inner.config.interval_for(failures);
                    tokio::select! {
                        _ = tokio::time::sleep(interval) => {}
                        _ = engine.inner.refresh_notify.notified() => {}
                        changed = selection.changed() => {
                            if changed.is_err() {
                                break;
                            }
                        }
                    }
                }
            }
        });

        RefreshHandle { handle }
    }
}

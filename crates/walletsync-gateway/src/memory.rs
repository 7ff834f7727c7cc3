//! In-memory fallback backend
//!
//! A [`WalletBackend`] that lives entirely in process memory, seeded with the
//! same demo data the real backend ships with. Used as the explicit fallback
//! store when the HTTP backend is unreachable, and as the backend for tests
//! and the demo binary. Failure and latency injection knobs make the
//! degraded-network paths testable without a network.

use crate::backend::{SendOutcome, WalletBackend};
use crate::types::{
    CreateTransactionBody, CreateWalletBody, HealthEnvelope, SendBody, WireTransaction, WireWallet,
};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use rand::Rng;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use walletsync_error::{Result, SyncError};

const DEMO_WALLET_ID: &str = "wallet_1";
const DEMO_ADDRESS: &str = "0x742d35cc6634c0532925a3b844bc9e7595f0beb1";

struct State {
    wallets: Vec<WireWallet>,
    transactions: Vec<WireTransaction>,
}

/// In-memory wallet backend with demo seed data.
#[derive(Clone)]
pub struct MemoryBackend {
    state: Arc<Mutex<State>>,
    failing: Arc<AtomicBool>,
    confirm_delay: Duration,
    latency: Duration,
    drift: Option<(Duration, f64)>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn seed_balances() -> HashMap<String, f64> {
    HashMap::from([
        ("eth".to_string(), 10.0),
        ("btc".to_string(), 0.5),
        ("bnb".to_string(), 50.0),
        ("usdc".to_string(), 5000.0),
        ("usdt".to_string(), 2500.0),
        ("pol".to_string(), 10000.0),
        ("trx".to_string(), 50000.0),
    ])
}

fn demo_wallet() -> WireWallet {
    WireWallet {
        id: DEMO_WALLET_ID.to_string(),
        name: "Demo Wallet".to_string(),
        kind: "native".to_string(),
        address: DEMO_ADDRESS.to_string(),
        public_key: "04a34b99f22c790c4e36b2b3c2c35a36db06226e41c692fc82b8b56ac1c540c5bd\
                     5b8dec5235a0fa8722476c7709c02559e3aa73aa03918ba2d492eea75abea235"
            .to_string(),
        network: "ethereum".to_string(),
        balance: seed_balances(),
        is_active: true,
        created_at: Some(Utc::now() - ChronoDuration::days(30)),
        updated_at: Some(Utc::now()),
    }
}

fn seed_transactions() -> Vec<WireTransaction> {
    vec![
        WireTransaction {
            hash: "0x3a1b2c3d4e5f60718293a4b5c6d7e8f9a0b1c2d3e4f5a6b7c8d9e0f1a2b3c4d5".to_string(),
            wallet_id: Some(DEMO_WALLET_ID.to_string()),
            from: "0x8ba1f109551bd432803012645ac136ddd64dba72".to_string(),
            to: DEMO_ADDRESS.to_string(),
            amount: 2.5,
            token: "eth".to_string(),
            network: "ethereum".to_string(),
            status: "confirmed".to_string(),
            direction: "receive".to_string(),
            block_number: Some(18_452_371),
            timestamp: Some(Utc::now() - ChronoDuration::hours(26)),
        },
        WireTransaction {
            hash: "0x9f8e7d6c5b4a39281706f5e4d3c2b1a09f8e7d6c5b4a39281706f5e4d3c2b1a0".to_string(),
            wallet_id: Some(DEMO_WALLET_ID.to_string()),
            from: DEMO_ADDRESS.to_string(),
            to: "0x1f9090aae28b8a3dceadf281b0f12828e676c326".to_string(),
            amount: 0.5,
            token: "eth".to_string(),
            network: "ethereum".to_string(),
            status: "confirmed".to_string(),
            direction: "send".to_string(),
            block_number: Some(18_449_102),
            timestamp: Some(Utc::now() - ChronoDuration::hours(4)),
        },
    ]
}

fn random_hash() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill(&mut bytes);
    format!("0x{}", hex::encode(bytes))
}

fn millis_id(prefix: &str) -> String {
    format!("{prefix}_{}", Utc::now().timestamp_millis())
}

impl MemoryBackend {
    /// Create a backend pre-seeded with the demo wallet and its history.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                wallets: vec![demo_wallet()],
                transactions: seed_transactions(),
            })),
            failing: Arc::new(AtomicBool::new(false)),
            confirm_delay: Duration::from_secs(3),
            latency: Duration::ZERO,
            drift: None,
        }
    }

    /// Create a backend with no wallets at all (exercises the seed path).
    pub fn empty() -> Self {
        let backend = Self::new();
        backend
            .state
            .lock()
            .expect("state lock poisoned")
            .wallets
            .clear();
        backend
    }

    /// Set how long a sent transaction stays pending before confirming.
    pub fn with_confirm_delay(mut self, delay: Duration) -> Self {
        self.confirm_delay = delay;
        self
    }

    /// Inject artificial latency into every call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Enable balance drift: every `interval`, the demo wallet's eth balance
    /// moves by a random amount within `±magnitude`. Makes the live-refresh
    /// path visibly do something in the demo. Start it with
    /// [`spawn_drift`](Self::spawn_drift).
    pub fn with_drift(mut self, interval: Duration, magnitude: f64) -> Self {
        self.drift = Some((interval, magnitude));
        self
    }

    /// Spawn the drift task configured via [`with_drift`](Self::with_drift).
    /// Returns `None` when drift is not configured. Abort the returned handle
    /// to stop drifting.
    pub fn spawn_drift(&self) -> Option<tokio::task::JoinHandle<()>> {
        let (interval, magnitude) = self.drift?;
        let state = Arc::clone(&self.state);
        Some(tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                let mut state = state.lock().expect("state lock poisoned");
                if let Some(wallet) = state.wallets.iter_mut().find(|w| w.id == DEMO_WALLET_ID) {
                    let delta = rand::thread_rng().gen_range(-magnitude..=magnitude);
                    let current = wallet.balance.get("eth").copied().unwrap_or(0.0);
                    let next = (current + delta).max(0.0);
                    wallet.balance.insert("eth".to_string(), next);
                    wallet.updated_at = Some(Utc::now());
                    tracing::trace!(delta, next, "demo balance drifted");
                }
            }
        }))
    }

    /// Toggle failure injection. While on, every call fails with a transport
    /// error, as if the process lost its network.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Restore the demo wallet's balances to their seeded values.
    pub fn reset_balances(&self) {
        let mut state = self.state.lock().expect("state lock poisoned");
        if let Some(wallet) = state.wallets.iter_mut().find(|w| w.id == DEMO_WALLET_ID) {
            wallet.balance = seed_balances();
            wallet.updated_at = Some(Utc::now());
        }
    }

    async fn gate(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SyncError::Transport("injected failure".to_string()));
        }
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        Ok(())
    }

    fn spawn_confirmation(&self, hash: String) {
        let state = Arc::clone(&self.state);
        let delay = self.confirm_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut state = state.lock().expect("state lock poisoned");
            if let Some(tx) = state
                .transactions
                .iter_mut()
                .find(|tx| tx.hash == hash && tx.status == "pending")
            {
                tx.status = "confirmed".to_string();
                tx.block_number = Some(rand::thread_rng().gen_range(18_000_000..19_000_000));
                tracing::debug!(%hash, "mock transaction confirmed");
            }
        });
    }
}

#[async_trait]
impl WalletBackend for MemoryBackend {
    async fn list_wallets(&self, kind: Option<&str>) -> Result<Vec<WireWallet>> {
        self.gate().await?;
        let state = self.state.lock().expect("state lock poisoned");
        Ok(state
            .wallets
            .iter()
            .filter(|w| w.is_active)
            .filter(|w| kind.map_or(true, |k| w.kind == k))
            .cloned()
            .collect())
    }

    async fn get_wallet(&self, id: &str) -> Result<WireWallet> {
        self.gate().await?;
        let state = self.state.lock().expect("state lock poisoned");
        state
            .wallets
            .iter()
            .find(|w| w.id == id && w.is_active)
            .cloned()
            .ok_or_else(|| SyncError::WalletNotFound(id.to_string()))
    }

    async fn create_wallet(&self, body: &CreateWalletBody) -> Result<WireWallet> {
        self.gate().await?;
        let wallet = WireWallet {
            id: millis_id("wallet"),
            name: body.name.clone(),
            kind: body.kind.clone(),
            address: body.address.clone(),
            public_key: body.public_key.clone(),
            network: body.network.clone(),
            balance: HashMap::new(),
            is_active: true,
            created_at: Some(Utc::now()),
            updated_at: Some(Utc::now()),
        };
        let mut state = self.state.lock().expect("state lock poisoned");
        state.wallets.push(wallet.clone());
        Ok(wallet)
    }

    async fn update_balance(&self, wallet_id: &str, asset: &str, amount: f64) -> Result<()> {
        self.gate().await?;
        let mut state = self.state.lock().expect("state lock poisoned");
        let wallet = state
            .wallets
            .iter_mut()
            .find(|w| w.id == wallet_id && w.is_active)
            .ok_or_else(|| SyncError::WalletNotFound(wallet_id.to_string()))?;
        wallet.balance.insert(asset.to_string(), amount.max(0.0));
        wallet.updated_at = Some(Utc::now());
        Ok(())
    }

    async fn delete_wallet(&self, id: &str) -> Result<()> {
        self.gate().await?;
        let mut state = self.state.lock().expect("state lock poisoned");
        let wallet = state
            .wallets
            .iter_mut()
            .find(|w| w.id == id)
            .ok_or_else(|| SyncError::WalletNotFound(id.to_string()))?;
        wallet.is_active = false;
        Ok(())
    }

    async fn list_transactions(
        &self,
        wallet_id: &str,
        limit: Option<u32>,
    ) -> Result<Vec<WireTransaction>> {
        self.gate().await?;
        let state = self.state.lock().expect("state lock poisoned");
        let mut transactions: Vec<_> = state
            .transactions
            .iter()
            .filter(|tx| tx.wallet_id.as_deref() == Some(wallet_id))
            .cloned()
            .collect();
        transactions.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        if let Some(limit) = limit {
            transactions.truncate(limit as usize);
        }
        Ok(transactions)
    }

    async fn create_transaction(&self, body: &CreateTransactionBody) -> Result<WireTransaction> {
        self.gate().await?;
        let tx = WireTransaction {
            hash: body.tx_hash.clone().unwrap_or_else(random_hash),
            wallet_id: Some(body.wallet_id.clone()),
            from: body.from.clone(),
            to: body.to.clone(),
            amount: body.amount,
            token: body.token.clone(),
            network: body.network.clone(),
            status: "pending".to_string(),
            direction: body.direction.clone(),
            block_number: None,
            timestamp: Some(Utc::now()),
        };
        let mut state = self.state.lock().expect("state lock poisoned");
        state.transactions.push(tx.clone());
        Ok(tx)
    }

    async fn update_transaction_status(
        &self,
        tx_hash: &str,
        status: &str,
        block_number: Option<u64>,
    ) -> Result<()> {
        self.gate().await?;
        let mut state = self.state.lock().expect("state lock poisoned");
        let tx = state
            .transactions
            .iter_mut()
            .find(|tx| tx.hash == tx_hash)
            .ok_or_else(|| SyncError::Other(format!("transaction not found: {tx_hash}")))?;
        tx.status = status.to_string();
        if block_number.is_some() {
            tx.block_number = block_number;
        }
        Ok(())
    }

    async fn send(&self, body: &SendBody) -> Result<SendOutcome> {
        self.gate().await?;
        let tx = {
            let mut state = self.state.lock().expect("state lock poisoned");
            let wallet = state
                .wallets
                .iter_mut()
                .find(|w| w.id == body.wallet_id && w.is_active)
                .ok_or_else(|| SyncError::WalletNotFound(body.wallet_id.clone()))?;

            // Server-side balance check, independent of any client validation.
            let current = wallet.balance.get(&body.token).copied().unwrap_or(0.0);
            if current < body.amount {
                return Err(SyncError::Http {
                    status: 400,
                    message: "Insufficient balance".to_string(),
                });
            }

            let new_balance = (current - body.amount).max(0.0);
            wallet.balance.insert(body.token.clone(), new_balance);
            wallet.updated_at = Some(Utc::now());
            let from = wallet.address.clone();

            let tx = WireTransaction {
                hash: random_hash(),
                wallet_id: Some(body.wallet_id.clone()),
                from,
                to: body.to.clone(),
                amount: body.amount,
                token: body.token.clone(),
                network: body.network.clone(),
                status: "pending".to_string(),
                direction: "send".to_string(),
                block_number: None,
                timestamp: Some(Utc::now()),
            };
            state.transactions.push(tx.clone());
            SendOutcome {
                new_balance: Some(new_balance),
                transaction: tx,
                fallback: false,
            }
        };

        self.spawn_confirmation(tx.transaction.hash.clone());
        Ok(tx)
    }

    async fn seed(&self) -> Result<()> {
        self.gate().await?;
        let mut state = self.state.lock().expect("state lock poisoned");
        if !state.wallets.iter().any(|w| w.is_active) {
            state.wallets.push(demo_wallet());
            state.transactions.extend(seed_transactions());
            tracing::info!("seeded demo wallet");
        }
        Ok(())
    }

    async fn health(&self) -> Result<HealthEnvelope> {
        self.gate().await?;
        Ok(HealthEnvelope {
            status: "ok".to_string(),
            database: None,
        })
    }
}

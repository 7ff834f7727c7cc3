//! The `WalletBackend` seam
//!
//! One async trait covering every backend capability the sync core consumes.
//! The HTTP gateway and the in-memory fallback backend both implement it, so
//! the directory, engine and send pipeline are transport-agnostic.

use crate::types::{
    CreateTransactionBody, CreateWalletBody, HealthEnvelope, SendBody, WireTransaction, WireWallet,
};
use async_trait::async_trait;
use walletsync_error::Result;

/// Outcome of the composite `send` operation.
#[derive(Debug, Clone)]
pub struct SendOutcome {
    /// The created transaction record
    pub transaction: WireTransaction,
    /// Authoritative post-debit balance, when the backend performed the debit
    pub new_balance: Option<f64>,
    /// True when this outcome was synthesized because the backend was
    /// unreachable; callers must not treat `new_balance` as authoritative
    pub fallback: bool,
}

/// Backend capabilities consumed by the sync core.
///
/// Every method returns `Result` and never panics; transport and HTTP
/// failures are expressed through [`walletsync_error::SyncError`].
#[async_trait]
pub trait WalletBackend: Send + Sync {
    /// List wallets, optionally filtered by kind ("native" / "imported").
    async fn list_wallets(&self, kind: Option<&str>) -> Result<Vec<WireWallet>>;

    /// Fetch a single wallet by id.
    async fn get_wallet(&self, id: &str) -> Result<WireWallet>;

    /// Create a wallet.
    async fn create_wallet(&self, body: &CreateWalletBody) -> Result<WireWallet>;

    /// Set the absolute balance of one asset on a wallet.
    async fn update_balance(&self, wallet_id: &str, asset: &str, amount: f64) -> Result<()>;

    /// Deactivate a wallet (soft delete).
    async fn delete_wallet(&self, id: &str) -> Result<()>;

    /// List a wallet's transactions, most recent first.
    async fn list_transactions(
        &self,
        wallet_id: &str,
        limit: Option<u32>,
    ) -> Result<Vec<WireTransaction>>;

    /// Record a transaction.
    async fn create_transaction(&self, body: &CreateTransactionBody) -> Result<WireTransaction>;

    /// Update a transaction's status (and block number, once confirmed).
    async fn update_transaction_status(
        &self,
        tx_hash: &str,
        status: &str,
        block_number: Option<u64>,
    ) -> Result<()>;

    /// Composite atomic send: backend-side balance check, transaction record,
    /// debit, and authoritative new balance.
    async fn send(&self, body: &SendBody) -> Result<SendOutcome>;

    /// Ask the backend to seed its demo data. Idempotent.
    async fn seed(&self) -> Result<()>;

    /// Backend health probe, used for the demo-mode indicator only.
    async fn health(&self) -> Result<HealthEnvelope>;
}

//! # walletsync-gateway
//!
//! The remote wallet gateway: wire types for the backend REST surface, the
//! [`WalletBackend`] trait seam, an HTTP implementation with health-gated
//! calls and transport retries, and an in-memory fallback backend with demo
//! seed data.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use walletsync_gateway::{GatewayConfig, HttpGateway, WalletBackend};
//! use walletsync_resilience::NetworkHealth;
//!
//! # async fn example() -> walletsync_error::Result<()> {
//! let health = Arc::new(NetworkHealth::default_web());
//! let gateway = HttpGateway::new(GatewayConfig::new("http://localhost:3001/api"), health)?;
//!
//! let wallets = gateway.list_wallets(None).await?;
//! for wallet in wallets {
//!     println!("{}: {:?}", wallet.name, wallet.balance);
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod backend;
pub mod http;
pub mod memory;
pub mod types;

pub use backend::{SendOutcome, WalletBackend};
pub use http::{GatewayConfig, HttpGateway};
pub use memory::MemoryBackend;
pub use types::{
    AckEnvelope, CreateTransactionBody, CreateWalletBody, ErrorBody, HealthEnvelope, SendBody,
    SendEnvelope, TransactionEnvelope, TransactionListEnvelope, UpdateBalanceBody,
    UpdateTxStatusBody, WalletEnvelope, WalletListEnvelope, WireTransaction, WireWallet,
};

//! Core wallet data model
//!
//! Typed counterparts of the backend wire records, plus the placeholder key
//! material generation the demo uses. The generated address and public key are
//! random hex with the right shape only; real key generation belongs to an
//! external key-management collaborator and is out of scope here.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use walletsync_gateway::{WireTransaction, WireWallet};

/// Supported networks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainNetwork {
    /// Ethereum mainnet
    #[default]
    Ethereum,
    /// BNB Smart Chain
    Bsc,
    /// Tron
    Tron,
}

impl ChainNetwork {
    /// Wire name of the network
    pub fn as_str(&self) -> &'static str {
        match self {
            ChainNetwork::Ethereum => "ethereum",
            ChainNetwork::Bsc => "bsc",
            ChainNetwork::Tron => "tron",
        }
    }

    /// The asset that pays gas on this network
    pub fn native_asset(&self) -> &'static str {
        match self {
            ChainNetwork::Ethereum => "eth",
            ChainNetwork::Bsc => "bnb",
            ChainNetwork::Tron => "trx",
        }
    }

    /// Parse a wire name, defaulting to Ethereum for unknown values.
    pub fn parse(name: &str) -> Self {
        match name {
            "bsc" => ChainNetwork::Bsc,
            "tron" => ChainNetwork::Tron,
            _ => ChainNetwork::Ethereum,
        }
    }
}

/// How a wallet entered the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletKind {
    /// Created in this app
    #[default]
    Native,
    /// Imported from elsewhere
    Imported,
}

impl WalletKind {
    /// Wire name of the kind
    pub fn as_str(&self) -> &'static str {
        match self {
            WalletKind::Native => "native",
            WalletKind::Imported => "imported",
        }
    }

    /// Parse a wire name, defaulting to Native for unknown values.
    pub fn parse(name: &str) -> Self {
        match name {
            "imported" => WalletKind::Imported,
            _ => WalletKind::Native,
        }
    }
}

/// Transaction lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    /// Submitted, not yet confirmed
    Pending,
    /// Included in a block
    Confirmed,
    /// Rejected or dropped
    Failed,
}

impl TxStatus {
    /// Parse a wire status, defaulting to Pending for unknown values.
    pub fn parse(name: &str) -> Self {
        match name {
            "confirmed" => TxStatus::Confirmed,
            "failed" => TxStatus::Failed,
            _ => TxStatus::Pending,
        }
    }
}

/// Direction of a transaction relative to the owning wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxDirection {
    /// Outgoing
    Send,
    /// Incoming
    Receive,
}

/// A wallet as the sync core sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    /// Unique id within the directory
    pub id: String,
    /// Display name
    pub name: String,
    /// Native or imported
    pub kind: WalletKind,
    /// On-chain address
    pub address: String,
    /// Public key hex
    pub public_key: String,
    /// Home network
    pub network: ChainNetwork,
    /// Per-asset balances, keyed by lowercase symbol
    pub balances: HashMap<String, f64>,
    /// Whether this wallet is the current selection
    pub is_selected: bool,
    /// Soft-delete flag
    pub is_active: bool,
    /// Creation timestamp
    pub created_at: Option<DateTime<Utc>>,
    /// Last update timestamp
    pub updated_at: Option<DateTime<Utc>>,
}

impl Wallet {
    /// Convert from the wire representation. Selection is local state and
    /// starts false.
    pub fn from_wire(wire: WireWallet) -> Self {
        Self {
            network: ChainNetwork::parse(&wire.network),
            kind: WalletKind::parse(&wire.kind),
            id: wire.id,
            name: wire.name,
            address: wire.address,
            public_key: wire.public_key,
            balances: wire.balance,
            is_selected: false,
            is_active: wire.is_active,
            created_at: wire.created_at,
            updated_at: wire.updated_at,
        }
    }

    /// New wallet with freshly generated placeholder key material and no
    /// balances.
    pub fn new(name: impl Into<String>, kind: WalletKind, network: ChainNetwork) -> Self {
        Self {
            id: format!("wallet_{}", Utc::now().timestamp_millis()),
            name: name.into(),
            kind,
            address: generate_address(),
            public_key: generate_public_key(),
            network,
            balances: HashMap::new(),
            is_selected: false,
            is_active: true,
            created_at: Some(Utc::now()),
            updated_at: Some(Utc::now()),
        }
    }

    /// Balance of one asset, 0 if absent.
    pub fn balance(&self, asset: &str) -> f64 {
        self.balances.get(asset).copied().unwrap_or(0.0)
    }
}

/// A transaction as the sync core sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Transaction hash
    pub hash: String,
    /// Owning wallet id, when known
    pub wallet_id: Option<String>,
    /// Sender address
    pub from: String,
    /// Recipient address
    pub to: String,
    /// Amount in display units
    pub amount: f64,
    /// Asset symbol
    pub asset: String,
    /// Network wire name
    pub network: String,
    /// Lifecycle status
    pub status: TxStatus,
    /// Send or receive
    pub direction: TxDirection,
    /// Block number once confirmed
    pub block_number: Option<u64>,
    /// Creation time
    pub timestamp: Option<DateTime<Utc>>,
}

impl Transaction {
    /// Convert from the wire representation.
    pub fn from_wire(wire: WireTransaction) -> Self {
        Self {
            status: TxStatus::parse(&wire.status),
            direction: if wire.direction == "receive" {
                TxDirection::Receive
            } else {
                TxDirection::Send
            },
            hash: wire.hash,
            wallet_id: wire.wallet_id,
            from: wire.from,
            to: wire.to,
            amount: wire.amount,
            asset: wire.token,
            network: wire.network,
            block_number: wire.block_number,
            timestamp: wire.timestamp,
        }
    }
}

fn random_hex(len: usize) -> String {
    let mut bytes = vec![0u8; len / 2];
    rand::thread_rng().fill(bytes.as_mut_slice());
    hex::encode(bytes)
}

/// Placeholder address: `0x` plus 40 hex chars. Not cryptographic.
pub fn generate_address() -> String {
    format!("0x{}", random_hex(40))
}

/// Placeholder public key: 128 hex chars. Not cryptographic.
pub fn generate_public_key() -> String {
    random_hex(128)
}

/// Randomized demo balances for a wallet created while the backend is
/// unreachable, so the UI still has plausible data to show.
pub fn random_demo_balances() -> HashMap<String, f64> {
    let mut rng = rand::thread_rng();
    HashMap::from([
        ("eth".to_string(), rng.gen_range(0.5..5.0)),
        ("btc".to_string(), rng.gen_range(0.01..0.2)),
        ("bnb".to_string(), rng.gen_range(1.0..20.0)),
        ("usdc".to_string(), rng.gen_range(100.0..2000.0)),
        ("usdt".to_string(), rng.gen_range(100.0..2000.0)),
    ])
}

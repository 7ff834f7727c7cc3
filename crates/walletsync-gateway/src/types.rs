//! Wire types for the backend REST surface
//!
//! All JSON field names follow the backend's camelCase contract. The wallet
//! balance map is named `balance` on the wire (singular, a historical quirk of
//! the backend schema).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A wallet as the backend represents it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireWallet {
    /// Backend wallet id
    pub id: String,
    /// Display name
    pub name: String,
    /// Wallet kind ("native" or "imported")
    #[serde(rename = "type")]
    pub kind: String,
    /// On-chain address
    pub address: String,
    /// Public key hex
    #[serde(default)]
    pub public_key: String,
    /// Network name ("ethereum", "bsc", "tron")
    pub network: String,
    /// Per-asset balances, keyed by lowercase asset symbol
    #[serde(default)]
    pub balance: HashMap<String, f64>,
    /// Soft-delete flag
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Creation timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Last update timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_true() -> bool {
    true
}

/// A transaction record as the backend represents it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireTransaction {
    /// Transaction hash (also the backend's primary identifier)
    pub hash: String,
    /// Owning wallet id, absent on some legacy rows
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_id: Option<String>,
    /// Sender address
    pub from: String,
    /// Recipient address
    pub to: String,
    /// Amount in the asset's display unit
    pub amount: f64,
    /// Asset symbol (lowercase)
    pub token: String,
    /// Network name
    pub network: String,
    /// "pending", "confirmed" or "failed"
    pub status: String,
    /// "send" or "receive", relative to the owning wallet
    #[serde(rename = "type")]
    pub direction: String,
    /// Block number once confirmed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    /// When the transaction was created
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// `{success, wallet}` envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletEnvelope {
    /// Backend success flag
    pub success: bool,
    /// The wallet payload
    pub wallet: WireWallet,
}

/// `{success, wallets[]}` envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletListEnvelope {
    /// Backend success flag
    pub success: bool,
    /// The wallet list payload
    #[serde(default)]
    pub wallets: Vec<WireWallet>,
}

/// `{success, transaction}` envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionEnvelope {
    /// Backend success flag
    pub success: bool,
    /// The transaction payload
    pub transaction: WireTransaction,
}

/// `{success, transactions[]}` envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionListEnvelope {
    /// Backend success flag
    pub success: bool,
    /// The transaction list payload
    #[serde(default)]
    pub transactions: Vec<WireTransaction>,
}

/// `{success, transaction, newBalance, fallback?}` envelope from `POST /send`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEnvelope {
    /// Backend success flag
    pub success: bool,
    /// The created transaction
    pub transaction: WireTransaction,
    /// Authoritative post-debit balance, when the backend performed the debit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_balance: Option<f64>,
    /// True when the response was synthesized client-side because the backend
    /// was unreachable
    #[serde(default)]
    pub fallback: bool,
}

/// Bare `{success}` acknowledgment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckEnvelope {
    /// Backend success flag
    pub success: bool,
}

/// `GET /health` response. Consulted only for the demo-mode banner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthEnvelope {
    /// "ok" or "degraded"
    pub status: String,
    /// Opaque database diagnostics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<serde_json::Value>,
}

impl HealthEnvelope {
    /// Whether the backend reports itself fully healthy.
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// Best-effort shape of a backend error body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    /// Primary error string
    #[serde(default)]
    pub error: Option<String>,
    /// Secondary message string
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorBody {
    /// The most useful message this body carries, if any.
    pub fn into_message(self) -> Option<String> {
        self.error.or(self.message)
    }
}

/// Body for `POST /wallets`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWalletBody {
    /// Display name
    pub name: String,
    /// Wallet kind ("native" or "imported")
    #[serde(rename = "type")]
    pub kind: String,
    /// On-chain address
    pub address: String,
    /// Public key hex
    pub public_key: String,
    /// Network name
    pub network: String,
    /// Optional mnemonic, demo placeholder only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mnemonic: Option<String>,
    /// Optional private key, demo placeholder only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
}

/// Body for `PUT /wallets/:id/balance`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBalanceBody {
    /// Asset symbol (lowercase)
    pub token_symbol: String,
    /// New absolute balance
    pub balance: f64,
}

/// Body for `POST /transactions`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransactionBody {
    /// Owning wallet id
    pub wallet_id: String,
    /// Sender address
    pub from: String,
    /// Recipient address
    pub to: String,
    /// Amount in display units
    pub amount: f64,
    /// Asset symbol
    pub token: String,
    /// Network name
    pub network: String,
    /// Pre-assigned hash, if the client generated one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    /// "send" or "receive"
    #[serde(rename = "type")]
    pub direction: String,
}

/// Body for `POST /send`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendBody {
    /// Sending wallet id
    pub wallet_id: String,
    /// Recipient address
    pub to: String,
    /// Amount in display units
    pub amount: f64,
    /// Asset symbol
    pub token: String,
    /// Network name
    pub network: String,
}

/// Body for `PUT /transactions/:txHash/status`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTxStatusBody {
    /// New status ("pending", "confirmed", "failed")
    pub status: String,
    /// Block number, for confirmed transactions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wallet_wire_names() {
        let json = serde_json::json!({
            "id": "wallet_1",
            "name": "Demo Wallet",
            "type": "native",
            "address": "0xabc",
            "publicKey": "04deadbeef",
            "network": "ethereum",
            "balance": { "eth": 10.0, "usdc": 5000.0 },
            "isActive": true
        });

        let wallet: WireWallet = serde_json::from_value(json).unwrap();
        assert_eq!(wallet.kind, "native");
        assert_eq!(wallet.public_key, "04deadbeef");
        assert_eq!(wallet.balance["eth"], 10.0);

        let out = serde_json::to_value(&wallet).unwrap();
        assert!(out.get("type").is_some());
        assert!(out.get("publicKey").is_some());
        assert!(out.get("balance").is_some());
    }

    #[test]
    fn test_send_envelope_fallback_defaults_false() {
        let json = serde_json::json!({
            "success": true,
            "transaction": {
                "hash": "0xfeed",
                "from": "0x1",
                "to": "0x2",
                "amount": 1.0,
                "token": "eth",
                "network": "ethereum",
                "status": "pending",
                "type": "send"
            },
            "newBalance": 9.0
        });

        let envelope: SendEnvelope = serde_json::from_value(json).unwrap();
        assert!(!envelope.fallback);
        assert_eq!(envelope.new_balance, Some(9.0));
        assert_eq!(envelope.transaction.direction, "send");
    }

    #[test]
    fn test_error_body_prefers_error_field() {
        let body: ErrorBody =
            serde_json::from_str(r#"{"error":"Insufficient balance","message":"ignored"}"#)
                .unwrap();
        assert_eq!(body.into_message().as_deref(), Some("Insufficient balance"));

        let empty: ErrorBody = serde_json::from_str("{}").unwrap();
        assert!(empty.into_message().is_none());
    }
}

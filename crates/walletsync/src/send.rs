//! Transaction submission pipeline
//!
//! One send is a small state machine: `Form → Confirming → Processing →
//! Success | Error`. Validation is local and synchronous; the optimistic
//! balance debit happens before the gateway call, and a later failure keeps
//! the debit (the flow favors responsiveness over strict consistency, and
//! flags the degraded state through the engine instead of rolling back).

use crate::config::SyncConfig;
use crate::engine::BalanceEngine;
use crate::model::{ChainNetwork, Wallet};
use std::sync::Arc;
use walletsync_error::{Result, SyncError};
use walletsync_gateway::{SendBody, WalletBackend};

/// Pipeline state for a single send.
#[derive(Debug, Clone, PartialEq)]
pub enum SendState {
    /// Collecting recipient, amount, asset
    Form,
    /// Validated, awaiting explicit confirmation
    Confirming,
    /// Gateway call in flight
    Processing,
    /// Completed
    Success {
        /// Hash of the created transaction
        tx_hash: String,
    },
    /// Failed after confirmation
    Error {
        /// User-facing message
        message: String,
    },
}

/// Validated send details carried from `Confirming` into `Processing`.
#[derive(Debug, Clone)]
pub struct SendDetails {
    /// Sending wallet id
    pub wallet_id: String,
    /// Sender address
    pub from: String,
    /// Recipient address
    pub to: String,
    /// Amount in display units
    pub amount: f64,
    /// Asset symbol
    pub asset: String,
    /// Network the send happens on
    pub network: ChainNetwork,
    /// Estimated network fee in the native asset
    pub estimated_fee: f64,
}

/// State machine driving one send through validation, confirmation and
/// submission.
pub struct SendPipeline {
    engine: BalanceEngine,
    backend: Arc<dyn WalletBackend>,
    config: SyncConfig,
    state: SendState,
    details: Option<SendDetails>,
}

impl SendPipeline {
    /// New pipeline in the `Form` state.
    pub fn new(engine: BalanceEngine, backend: Arc<dyn WalletBackend>, config: SyncConfig) -> Self {
        Self {
            engine,
            backend,
            config,
            state: SendState::Form,
            details: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> &SendState {
        &self.state
    }

    /// Validated details, present from `Confirming` onward.
    pub fn details(&self) -> Option<&SendDetails> {
        self.details.as_ref()
    }

    /// Validate the form and move to `Confirming`.
    ///
    /// The balance checked is the engine's current view, which includes any
    /// optimistic writes. Every failed rule surfaces its own error and leaves
    /// the pipeline in `Form`.
    pub fn begin_confirmation(
        &mut self,
        wallet: &Wallet,
        to: &str,
        amount: &str,
        asset: &str,
    ) -> Result<()> {
        if self.state != SendState::Form {
            return Err(SyncError::InvalidState(format!(
                "cannot start confirmation from {:?}",
                self.state
            )));
        }

        validate_address(to)?;
        let balance = self.engine.get_balance(&wallet.id, asset);
        let is_native = asset == wallet.network.native_asset();
        let amount = validate_amount(amount, balance, is_native, self.config.gas_reserve)?;

        self.details = Some(SendDetails {
            wallet_id: wallet.id.clone(),
            from: wallet.address.clone(),
            to: to.to_string(),
            amount,
            asset: asset.to_string(),
            network: wallet.network,
            estimated_fee: estimate_fee(wallet.network),
        });
        self.state = SendState::Confirming;
        Ok(())
    }

    /// Cancel a pending confirmation, back to `Form`.
    pub fn cancel(&mut self) {
        if self.state == SendState::Confirming {
            self.state = SendState::Form;
            self.details = None;
        }
    }

    /// Start a new send from a terminal state.
    pub fn reset(&mut self) {
        if matches!(self.state, SendState::Success { .. } | SendState::Error { .. }) {
            self.state = SendState::Form;
            self.details = None;
        }
    }

    /// Submit the confirmed send.
    ///
    /// Debits the balance optimistically, calls the gateway, and reconciles
    /// with the authoritative new balance when the backend performed the
    /// debit itself. An error keeps the optimistic debit.
    pub async fn confirm(&mut self) -> Result<String> {
        let details = match (&self.state, &self.details) {
            (SendState::Confirming, Some(details)) => details.clone(),
            _ => {
                return Err(SyncError::InvalidState(format!(
                    "cannot confirm from {:?}",
                    self.state
                )))
            }
        };
        self.state = SendState::Processing;

        let current = self.engine.get_balance(&details.wallet_id, &details.asset);
        let optimistic = (current - details.amount).max(0.0);
        self.engine
            .set_optimistic(&details.wallet_id, &details.asset, optimistic);

        let body = SendBody {
            wallet_id: details.wallet_id.clone(),
            to: details.to.clone(),
            amount: details.amount,
            token: details.asset.clone(),
            network: details.network.as_str().to_string(),
        };

        match self.backend.send(&body).await {
            Ok(outcome) => {
                if let Some(new_balance) = outcome.new_balance {
                    // A synthesized fallback response carries no backend
                    // truth, so the optimistic value stands.
                    if !outcome.fallback {
                        self.engine
                            .update(&details.wallet_id, &details.asset, new_balance)
                            .await;
                    }
                }
                // Nudge the refresh loop shortly after the send settles so
                // the remote truth lands without waiting a full interval.
                let engine = self.engine.clone();
                let resync = self.config.post_send_resync;
                tokio::spawn(async move {
                    tokio::time::sleep(resync).await;
                    engine.refresh_now();
                });

                tokio::time::sleep(self.config.success_delay).await;
                let tx_hash = outcome.transaction.hash.clone();
                tracing::info!(
                    wallet = %details.wallet_id,
                    asset = %details.asset,
                    amount = details.amount,
                    %tx_hash,
                    fallback = outcome.fallback,
                    "send completed"
                );
                self.state = SendState::Success {
                    tx_hash: tx_hash.clone(),
                };
                Ok(tx_hash)
            }
            Err(e) => {
                tracing::warn!(
                    wallet = %details.wallet_id,
                    asset = %details.asset,
                    error = %e,
                    "send failed, optimistic debit kept"
                );
                self.state = SendState::Error {
                    message: e.to_string(),
                };
                Err(e)
            }
        }
    }
}

/// Validate a recipient address.
///
/// Accepted shapes: hex (`0x` + 40 hex chars), ENS-style `*.eth`,
/// name-service style `*.bnb` / `*.arb`, or anything longer than 10
/// characters as a permissive fallback.
pub fn validate_address(address: &str) -> Result<()> {
    if address.is_empty() {
        return Err(SyncError::AddressRequired);
    }
    let hex_shaped = address.len() == 42
        && address.starts_with("0x")
        && address[2..].chars().all(|c| c.is_ascii_hexdigit());
    let ens = address.ends_with(".eth") && address.len() > 4;
    let name_service =
        (address.ends_with(".bnb") || address.ends_with(".arb")) && address.len() > 4;
    if hex_shaped || ens || name_service || address.len() > 10 {
        Ok(())
    } else {
        Err(SyncError::InvalidAddress(address.to_string()))
    }
}

/// Validate an amount string against the spendable balance. Returns the
/// parsed amount. The native gas asset must leave the reserve unspent.
pub fn validate_amount(input: &str, balance: f64, is_native: bool, gas_reserve: f64) -> Result<f64> {
    let input = input.trim();
    if input.is_empty() {
        return Err(SyncError::AmountRequired);
    }
    let amount: f64 = input
        .parse()
        .map_err(|_| SyncError::InvalidAmount(input.to_string()))?;
    if !amount.is_finite() || amount <= 0.0 {
        return Err(SyncError::InvalidAmount(input.to_string()));
    }
    if amount > balance {
        return Err(SyncError::InsufficientBalance {
            have: balance,
            need: amount,
        });
    }
    if is_native && amount + gas_reserve > balance {
        return Err(SyncError::InsufficientBalance {
            have: (balance - gas_reserve).max(0.0),
            need: amount,
        });
    }
    Ok(amount)
}

/// Largest amount that passes validation for the given balance.
pub fn max_sendable(balance: f64, is_native: bool, gas_reserve: f64) -> f64 {
    if is_native {
        (balance - gas_reserve).max(0.0)
    } else {
        balance
    }
}

/// Flat demo fee estimate in the network's native asset.
pub fn estimate_fee(network: ChainNetwork) -> f64 {
    match network {
        ChainNetwork::Ethereum => 0.002,
        ChainNetwork::Bsc => 0.0005,
        ChainNetwork::Tron => 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEX: &str = "0x1f9090aae28b8a3dceadf281b0f12828e676c326";

    #[test]
    fn test_address_shapes() {
        assert!(validate_address(HEX).is_ok());
        assert!(validate_address("vitalik.eth").is_ok());
        assert!(validate_address("name.bnb").is_ok());
        assert!(validate_address("name.arb").is_ok());
        assert!(validate_address("somethinglongenough").is_ok());

        assert!(matches!(
            validate_address(""),
            Err(SyncError::AddressRequired)
        ));
        assert!(matches!(
            validate_address("short"),
            Err(SyncError::InvalidAddress(_))
        ));
        assert!(matches!(
            validate_address("0x123"),
            Err(SyncError::InvalidAddress(_))
        ));
        // Bare ".eth" has no name part.
        assert!(matches!(
            validate_address(".eth"),
            Err(SyncError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_amount_rules() {
        assert_eq!(validate_amount("1.5", 10.0, false, 0.01).unwrap(), 1.5);

        assert!(matches!(
            validate_amount("", 10.0, false, 0.01),
            Err(SyncError::AmountRequired)
        ));
        assert!(matches!(
            validate_amount("abc", 10.0, false, 0.01),
            Err(SyncError::InvalidAmount(_))
        ));
        assert!(matches!(
            validate_amount("-1", 10.0, false, 0.01),
            Err(SyncError::InvalidAmount(_))
        ));
        assert!(matches!(
            validate_amount("0", 10.0, false, 0.01),
            Err(SyncError::InvalidAmount(_))
        ));
        assert!(matches!(
            validate_amount("11", 10.0, false, 0.01),
            Err(SyncError::InsufficientBalance { .. })
        ));
    }

    #[test]
    fn test_native_asset_keeps_gas_reserve() {
        // Non-native: the full balance can go.
        assert!(validate_amount("10", 10.0, false, 0.01).is_ok());
        // Native: the reserve must stay behind.
        assert!(matches!(
            validate_amount("10", 10.0, true, 0.01),
            Err(SyncError::InsufficientBalance { .. })
        ));
        assert!(validate_amount("9.99", 10.0, true, 0.01).is_ok());
    }

    #[test]
    fn test_max_sendable() {
        assert_eq!(max_sendable(10.0, true, 0.01), 9.99);
        assert_eq!(max_sendable(10.0, false, 0.01), 10.0);
        assert_eq!(max_sendable(0.005, true, 0.01), 0.0);
    }
}

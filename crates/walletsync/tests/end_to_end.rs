//! End-to-end flows over the in-memory backend.

use proptest::prelude::*;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use walletsync::send::{validate_address, validate_amount};
use walletsync::{MemoryCache, SendState, SyncConfig, WalletHub};
use walletsync_error::SyncError;
use walletsync_gateway::{MemoryBackend, WalletBackend};
use walletsync_resilience::NetworkHealth;

fn hub_over(backend: MemoryBackend) -> WalletHub {
    WalletHub::new(
        Arc::new(backend),
        Arc::new(MemoryCache::new()),
        Arc::new(NetworkHealth::default_web()),
        SyncConfig::default().with_success_delay(Duration::ZERO),
    )
}

#[tokio::test]
async fn send_happy_path_debits_and_records() {
    let backend = MemoryBackend::new();
    backend.update_balance("wallet_1", "eth", 2.5).await.unwrap();

    let hub = hub_over(backend.clone());
    let wallets = hub.directory.refresh().await;
    hub.engine.refresh_all(&wallets).await;
    assert_eq!(hub.engine.get_balance("wallet_1", "eth"), 2.5);

    let wallet = hub.directory.selected().await.unwrap();
    let mut pipeline = hub.send_pipeline();
    pipeline
        .begin_confirmation(
            &wallet,
            "0x1f9090aae28b8a3dceadf281b0f12828e676c326",
            "1.0",
            "eth",
        )
        .unwrap();
    assert_eq!(*pipeline.state(), SendState::Confirming);

    let tx_hash = pipeline.confirm().await.unwrap();
    assert!(matches!(pipeline.state(), SendState::Success { .. }));
    assert_eq!(hub.engine.get_balance("wallet_1", "eth"), 1.5);

    let txs = hub.directory.transactions("wallet_1", None).await;
    let tx = txs.iter().find(|tx| tx.hash == tx_hash).unwrap();
    assert_eq!(tx.amount, 1.0);
    assert_eq!(tx.asset, "eth");
    assert!(matches!(
        tx.status,
        walletsync::TxStatus::Pending | walletsync::TxStatus::Confirmed
    ));
}

#[tokio::test]
async fn insufficient_balance_is_rejected_at_the_form() {
    let backend = MemoryBackend::new();
    backend
        .update_balance("wallet_1", "btc", 0.001)
        .await
        .unwrap();

    let hub = hub_over(backend);
    let wallets = hub.directory.refresh().await;
    hub.engine.refresh_all(&wallets).await;

    let wallet = hub.directory.selected().await.unwrap();
    let mut pipeline = hub.send_pipeline();
    let err = pipeline
        .begin_confirmation(
            &wallet,
            "0x1f9090aae28b8a3dceadf281b0f12828e676c326",
            "0.01",
            "btc",
        )
        .unwrap_err();

    assert!(matches!(err, SyncError::InsufficientBalance { .. }));
    assert_eq!(*pipeline.state(), SendState::Form);
    // The balance was never touched.
    assert_eq!(hub.engine.get_balance("wallet_1", "btc"), 0.001);
}

#[tokio::test]
async fn failed_send_keeps_the_optimistic_debit() {
    let backend = MemoryBackend::new();
    let hub = hub_over(backend.clone());
    let wallets = hub.directory.refresh().await;
    hub.engine.refresh_all(&wallets).await;

    let wallet = hub.directory.selected().await.unwrap();
    let mut pipeline = hub.send_pipeline();
    pipeline
        .begin_confirmation(
            &wallet,
            "0x1f9090aae28b8a3dceadf281b0f12828e676c326",
            "2.0",
            "eth",
        )
        .unwrap();

    backend.set_failing(true);
    let err = pipeline.confirm().await.unwrap_err();
    assert!(err.is_retryable());
    assert!(matches!(pipeline.state(), SendState::Error { .. }));

    // The optimistic debit stands even though the send failed.
    assert_eq!(hub.engine.get_balance("wallet_1", "eth"), 8.0);

    // And a new send can start after acknowledging the error.
    pipeline.reset();
    assert_eq!(*pipeline.state(), SendState::Form);
}

#[tokio::test]
async fn cancel_returns_to_form_without_side_effects() {
    let hub = hub_over(MemoryBackend::new());
    let wallets = hub.directory.refresh().await;
    hub.engine.refresh_all(&wallets).await;

    let wallet = hub.directory.selected().await.unwrap();
    let mut pipeline = hub.send_pipeline();
    pipeline
        .begin_confirmation(
            &wallet,
            "0x1f9090aae28b8a3dceadf281b0f12828e676c326",
            "1.0",
            "eth",
        )
        .unwrap();
    pipeline.cancel();

    assert_eq!(*pipeline.state(), SendState::Form);
    assert_eq!(hub.engine.get_balance("wallet_1", "eth"), 10.0);
    assert!(matches!(
        pipeline.confirm().await.unwrap_err(),
        SyncError::InvalidState(_)
    ));
}

#[tokio::test]
async fn subscriber_sees_optimistic_value_before_confirm_returns() {
    let hub = hub_over(MemoryBackend::new());
    let wallets = hub.directory.refresh().await;
    hub.engine.refresh_all(&wallets).await;

    let observed = Arc::new(Mutex::new(Vec::new()));
    let sink = observed.clone();
    let _sub = hub.engine.subscribe("wallet_1", "eth", move |value| {
        sink.lock().unwrap().push(value);
    });

    let wallet = hub.directory.selected().await.unwrap();
    let mut pipeline = hub.send_pipeline();
    pipeline
        .begin_confirmation(
            &wallet,
            "0x1f9090aae28b8a3dceadf281b0f12828e676c326",
            "1.0",
            "eth",
        )
        .unwrap();
    pipeline.confirm().await.unwrap();

    let observed = observed.lock().unwrap();
    // First notification is the optimistic debit, before any reconciliation.
    assert_eq!(observed[0], 9.0);
    // Reconciliation repeats the same value; no bounce upward in between.
    assert!(observed.iter().all(|v| *v == 9.0));
}

#[tokio::test]
async fn degraded_backend_leaves_the_app_interactive() {
    let backend = MemoryBackend::new();
    let hub = hub_over(backend.clone());
    let wallets = hub.directory.refresh().await;
    hub.engine.refresh_all(&wallets).await;

    backend.set_failing(true);
    // Repeated refreshes degrade the engine but balances stay served.
    for _ in 0..4 {
        let wallets = hub.directory.wallets().await;
        hub.engine.refresh_all(&wallets).await;
    }
    assert!(!hub.engine.online() || hub.engine.consecutive_failures() > 0);
    assert_eq!(hub.engine.get_balance("wallet_1", "eth"), 10.0);

    // Optimistic writes still work while degraded.
    hub.engine.set_optimistic("wallet_1", "eth", 4.0);
    assert_eq!(hub.engine.get_balance("wallet_1", "eth"), 4.0);

    // Recovery: a successful forced refresh resets the failure accounting.
    backend.set_failing(false);
    let wallets = hub.directory.wallets().await;
    hub.engine.refresh_all_forced(&wallets).await;
    assert_eq!(hub.engine.consecutive_failures(), 0);
    assert!(hub.engine.online());
}

proptest! {
    #[test]
    fn hex_addresses_always_validate(body in "[0-9a-fA-F]{40}") {
        let addr = format!("0x{body}");
        prop_assert!(validate_address(&addr).is_ok());
    }

    #[test]
    fn address_validation_never_panics(input in ".{0,64}") {
        let _ = validate_address(&input);
    }

    #[test]
    fn validated_amounts_never_exceed_balance(
        amount in 0.0001f64..1_000_000.0,
        balance in 0.0f64..1_000_000.0,
    ) {
        let input = format!("{amount}");
        match validate_amount(&input, balance, false, 0.01) {
            Ok(parsed) => prop_assert!(parsed <= balance),
            Err(e) => {
                let expected =
                    matches!(e, SyncError::InsufficientBalance { .. } | SyncError::InvalidAmount(_));
                prop_assert!(expected, "unexpected error: {e:?}");
            }
        }
    }

    #[test]
    fn native_sends_leave_the_gas_reserve(
        amount in 0.0001f64..100.0,
        balance in 0.0f64..100.0,
    ) {
        let input = format!("{amount}");
        if let Ok(parsed) = validate_amount(&input, balance, true, 0.01) {
            prop_assert!(parsed + 0.01 <= balance);
        }
    }
}

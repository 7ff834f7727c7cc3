//! End-to-end demo over the in-memory backend: refresh balances, subscribe,
//! then send 1 ETH and watch the optimistic update land before the network
//! round-trip completes.
//!
//! Run with: `cargo run --example demo`

use std::sync::Arc;
use std::time::Duration;
use walletsync::{DemoPrices, MemoryCache, PriceSource, SyncConfig, WalletHub};
use walletsync_gateway::MemoryBackend;
use walletsync_resilience::NetworkHealth;

#[tokio::main]
async fn main() -> walletsync_error::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,walletsync=debug".into()),
        )
        .init();

    let backend = Arc::new(MemoryBackend::new().with_confirm_delay(Duration::from_secs(2)));
    let hub = WalletHub::new(
        backend.clone(),
        Arc::new(MemoryCache::new()),
        Arc::new(NetworkHealth::default_web()),
        SyncConfig::default().with_success_delay(Duration::from_millis(200)),
    );

    let wallets = hub.directory.refresh().await;
    hub.engine.refresh_all(&wallets).await;
    let _refresh = hub.spawn_refresh_loop();

    let wallet = hub
        .directory
        .selected()
        .await
        .expect("directory guarantees a selection");
    println!("selected wallet: {} ({})", wallet.name, wallet.id);

    let prices = DemoPrices;
    for (asset, _) in &wallet.balances {
        let amount = hub.engine.get_balance(&wallet.id, asset);
        match prices.usd_value(asset, amount) {
            Some(usd) => println!("  {asset}: {amount} (${usd:.2})"),
            None => println!("  {asset}: {amount}"),
        }
    }

    let _sub = hub.engine.subscribe(&wallet.id, "eth", |value| {
        println!("  [subscriber] eth balance is now {value}");
    });

    let mut pipeline = hub.send_pipeline();
    pipeline.begin_confirmation(
        &wallet,
        "0x1f9090aae28b8a3dceadf281b0f12828e676c326",
        "1.0",
        "eth",
    )?;
    println!("confirming send of 1.0 eth...");
    let tx_hash = pipeline.confirm().await?;
    println!("sent: {tx_hash}");

    // Give the mock backend time to confirm the pending transaction.
    tokio::time::sleep(Duration::from_secs(3)).await;
    for tx in hub.directory.transactions(&wallet.id, Some(5)).await {
        println!("  {:?} {} {} -> {:?}", tx.direction, tx.amount, tx.asset, tx.status);
    }

    Ok(())
}

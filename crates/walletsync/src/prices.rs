//! Demo price source
//!
//! Fixed USD prices used for fiat display in the demo. A real deployment
//! would plug a live rates provider in behind the same trait.

/// Source of USD prices for display purposes.
pub trait PriceSource: Send + Sync {
    /// USD price of one unit of the asset, if known.
    fn usd_price(&self, asset: &str) -> Option<f64>;

    /// USD value of an amount of the asset, if the price is known.
    fn usd_value(&self, asset: &str, amount: f64) -> Option<f64> {
        self.usd_price(asset).map(|price| price * amount)
    }
}

/// Fixed demo prices.
#[derive(Debug, Clone, Copy, Default)]
pub struct DemoPrices;

impl PriceSource for DemoPrices {
    fn usd_price(&self, asset: &str) -> Option<f64> {
        match asset {
            "btc" => Some(45_000.0),
            "eth" => Some(3_000.0),
            "bnb" => Some(300.0),
            "pol" => Some(0.8),
            "trx" => Some(0.1),
            "usdc" | "usdt" => Some(1.0),
            _ => None,
        }
    }
}

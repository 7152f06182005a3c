#![allow(dead_code)]

use fills_db::{FillStore, StoreOptions};
use fills_schemas::{FillRecord, Side};

/// Fresh in-memory store with the fills table migrated.
pub async fn memory_store() -> FillStore {
    let store = FillStore::open("sqlite::memory:", StoreOptions::default())
        .await
        .expect("open in-memory store");
    fills_db::migrate(&store).await.expect("migrate");
    store
}

pub async fn seeded_store(fills: &[FillRecord]) -> FillStore {
    let store = memory_store().await;
    fills_db::insert_fills(&store, fills)
        .await
        .expect("insert fixtures");
    store
}

pub fn fill(ts: i64, symbol: &str, exchange: &str, side: Side, price: f64, qty: f64) -> FillRecord {
    FillRecord::new(ts, symbol, exchange, side, price, qty)
}

/// Two symbols on two exchanges; BTC rows reproduce the three-fill example.
pub fn fixture() -> Vec<FillRecord> {
    vec![
        fill(1, "BTC", "BINANCE", Side::Buy, 100.0, 10.0),
        fill(2, "BTC", "COINBASE", Side::Sell, 110.0, 5.0),
        fill(3, "BTC", "BINANCE", Side::Sell, 90.0, 5.0),
        fill(2, "ETH", "BINANCE", Side::Buy, 20.0, 1.0),
        fill(4, "ETH", "KRAKEN", Side::Sell, 25.0, 2.0),
    ]
}

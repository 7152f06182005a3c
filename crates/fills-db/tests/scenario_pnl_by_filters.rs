//! Scenario: filter spec -> selection -> cumulative PnL, against a real
//! (in-memory) SQLite store.
//!
//! # Invariants under test
//!
//! 1. A single-value filter restricts only that column; empty lists add nothing.
//! 2. An empty spec (or all-empty lists) selects every row.
//! 3. Multi-value filters select by membership.
//! 4. Zero matching rows yield an empty series, not an error.
//! 5. Hostile filter values are bound, never executed.

mod common;

use common::{fixture, seeded_store};
use fills_db::{pnl_by_filters, select_fills, FillsError, QueryError};
use fills_schemas::{FilterSpec, FILL_COLUMNS};

fn cumulative(series: &fills_pnl::PnlSeries) -> Vec<f64> {
    series.points().iter().map(|p| p.cumulative_pnl).collect()
}

#[tokio::test]
async fn symbol_filter_reproduces_documented_series() {
    let store = seeded_store(&fixture()).await;
    let spec = FilterSpec::from_json_str(r#"{"symbol": ["BTC"], "exchange": []}"#).unwrap();

    let series = pnl_by_filters(&store, &spec).await.unwrap();
    assert_eq!(cumulative(&series), vec![0.0, 50.0, -550.0]);
}

#[tokio::test]
async fn empty_spec_selects_all_rows() {
    let store = seeded_store(&fixture()).await;

    for raw in ["{}", r#"{"symbol": [], "exchange": []}"#] {
        let spec = FilterSpec::from_json_str(raw).unwrap();
        let rs = select_fills(&store, &spec).await.unwrap();
        assert_eq!(rs.rows.len(), fixture().len());
        assert_eq!(rs.columns, FILL_COLUMNS);
    }
}

#[tokio::test]
async fn unfiltered_series_interleaves_symbols_by_timestamp() {
    let store = seeded_store(&fixture()).await;
    let series = pnl_by_filters(&store, &FilterSpec::new()).await.unwrap();

    // ts: 1 BUY 100 | 2 SELL 110, 2 BUY 20 | 3 SELL 90 | 4 SELL 25
    // prior: 0 | 100, 100 | 230 | 320
    assert_eq!(series.len(), 5);
    let rows = series.rows();
    assert_eq!(rows[1].prior_price_sum, 100.0);
    assert_eq!(rows[2].prior_price_sum, 100.0);
    assert_eq!(rows[3].prior_price_sum, 230.0);
    assert_eq!(rows[4].prior_price_sum, 320.0);
    assert_eq!(
        cumulative(&series),
        vec![0.0, 50.0, 50.0, 50.0 - 700.0, 50.0 - 700.0 - 590.0]
    );
}

#[tokio::test]
async fn membership_filter_over_exchanges() {
    let store = seeded_store(&fixture()).await;
    let spec = FilterSpec::new().with("exchange", ["COINBASE", "KRAKEN"]);
    let rs = select_fills(&store, &spec).await.unwrap();
    assert_eq!(rs.rows.len(), 2);
}

#[tokio::test]
async fn combined_filters_are_anded() {
    let store = seeded_store(&fixture()).await;
    let spec = FilterSpec::new()
        .with("symbol", ["BTC"])
        .with("exchange", ["BINANCE"]);
    let series = pnl_by_filters(&store, &spec).await.unwrap();
    // BUY 100 @1, SELL 90 x5 @3 => (90 - 100) * 5
    assert_eq!(cumulative(&series), vec![0.0, -50.0]);
}

#[tokio::test]
async fn no_matching_rows_is_an_empty_series() {
    let store = seeded_store(&fixture()).await;
    let spec = FilterSpec::new().with("symbol", ["DOGE"]);
    let series = pnl_by_filters(&store, &spec).await.unwrap();
    assert!(series.is_empty());
    assert_eq!(series.final_pnl(), None);
}

#[tokio::test]
async fn empty_table_is_an_empty_series() {
    let store = seeded_store(&[]).await;
    let series = pnl_by_filters(&store, &FilterSpec::new()).await.unwrap();
    assert!(series.is_empty());
}

#[tokio::test]
async fn hostile_values_are_bound_not_executed() {
    let store = seeded_store(&fixture()).await;
    let spec = FilterSpec::new().with("symbol", ["BTC' OR '1'='1", "x'); DROP TABLE fills; --"]);

    let rs = select_fills(&store, &spec).await.unwrap();
    assert!(rs.rows.is_empty());

    // table still intact
    let all = select_fills(&store, &FilterSpec::new()).await.unwrap();
    assert_eq!(all.rows.len(), fixture().len());
}

#[tokio::test]
async fn unknown_filter_column_is_a_query_error() {
    let store = seeded_store(&fixture()).await;
    let spec = FilterSpec::new().with("symbol = symbol --", ["x"]);
    let err = pnl_by_filters(&store, &spec).await.unwrap_err();
    assert!(matches!(
        err,
        FillsError::Query(QueryError::InvalidIdentifier { .. })
    ));
}

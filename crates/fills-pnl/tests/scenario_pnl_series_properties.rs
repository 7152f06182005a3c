//! Scenario: cumulative PnL series invariants
//!
//! # Invariants under test
//!
//! 1. The grouped single-pass calculation matches the O(n²) definition
//!    exactly, including duplicate-timestamp groups.
//! 2. Output length equals input row count.
//! 3. `cum[i] - cum[i-1] == pnl[i]`, `cum[0] == pnl[0]`.
//! 4. BUY-only input yields an all-zero series.
//! 5. `prior_price_sum` excludes every row sharing the same timestamp.
//!
//! All tests are pure; no IO, no DB.

use fills_pnl::{compute, compute_naive, compute_rows};
use fills_schemas::Cell;
use proptest::prelude::*;

const COLS: &[&str] = &["timestamp", "side", "fill_price", "fill_quantity"];

// ── Strategies ───────────────────────────────────────────────────────

fn arb_row() -> impl Strategy<Value = Vec<Cell>> {
    (
        0i64..8, // narrow range forces duplicate timestamps
        prop::bool::ANY,
        (0u32..50_000).prop_map(|p| p as f64 / 100.0),
        (0u32..1_000).prop_map(|q| q as f64 / 10.0),
    )
        .prop_map(|(ts, sell, price, qty)| {
            vec![
                Cell::Integer(ts),
                Cell::from(if sell { "SELL" } else { "BUY" }),
                Cell::Real(price),
                Cell::Real(qty),
            ]
        })
}

fn arb_rows() -> impl Strategy<Value = Vec<Vec<Cell>>> {
    prop::collection::vec(arb_row(), 0..40)
}

proptest! {
    #[test]
    fn grouped_pass_matches_naive_definition(rows in arb_rows()) {
        let fast = compute_rows(COLS, &rows).unwrap();
        let slow = compute_naive(COLS, &rows).unwrap();
        prop_assert_eq!(fast, slow);
    }

    #[test]
    fn one_point_per_row(rows in arb_rows()) {
        prop_assert_eq!(compute(COLS, &rows).unwrap().len(), rows.len());
    }

    #[test]
    fn cumulative_increments_equal_row_pnl(rows in arb_rows()) {
        let out = compute_rows(COLS, &rows).unwrap();
        let mut running = 0.0_f64;
        for r in &out {
            running += r.pnl;
            prop_assert_eq!(r.cumulative_pnl, running);
        }
        if let Some(first) = out.first() {
            prop_assert_eq!(first.cumulative_pnl, first.pnl);
        }
    }

    #[test]
    fn buy_only_input_is_flat_zero(rows in arb_rows()) {
        let buys: Vec<Vec<Cell>> = rows
            .into_iter()
            .map(|mut r| { r[1] = Cell::from("BUY"); r })
            .collect();
        for p in compute(COLS, &buys).unwrap() {
            prop_assert_eq!(p.cumulative_pnl, 0.0);
        }
    }

    #[test]
    fn output_is_sorted_by_timestamp(rows in arb_rows()) {
        let out = compute(COLS, &rows).unwrap();
        for w in out.windows(2) {
            prop_assert!(w[0].timestamp.total_cmp(&w[1].timestamp).is_le());
        }
    }

    #[test]
    fn prior_sum_excludes_same_timestamp_group(
        before in prop::collection::vec(1u32..100, 0..5),
        group in prop::collection::vec(1u32..100, 1..6),
    ) {
        // rows at ts=1 (before), then a group of SELLs all at ts=2
        let mut rows = Vec::new();
        for p in &before {
            rows.push(vec![Cell::Integer(1), "BUY".into(), Cell::Real(*p as f64), Cell::Real(1.0)]);
        }
        for p in &group {
            rows.push(vec![Cell::Integer(2), "SELL".into(), Cell::Real(*p as f64), Cell::Real(1.0)]);
        }
        let expected: f64 = before.iter().map(|p| *p as f64).sum();
        let out = compute_rows(COLS, &rows).unwrap();
        for r in out.iter().filter(|r| r.timestamp == Cell::Integer(2)) {
            prop_assert_eq!(r.prior_price_sum, expected);
        }
    }
}

// ── Concrete scenarios ───────────────────────────────────────────────

#[test]
fn documented_three_fill_scenario() {
    let rows = vec![
        vec![Cell::Integer(1), "BUY".into(), Cell::Real(100.0), Cell::Real(10.0)],
        vec![Cell::Integer(2), "SELL".into(), Cell::Real(110.0), Cell::Real(5.0)],
        vec![Cell::Integer(3), "SELL".into(), Cell::Real(90.0), Cell::Real(5.0)],
    ];
    let out = compute_rows(COLS, &rows).unwrap();
    assert_eq!(out[1].pnl, 50.0);
    assert_eq!(out[2].prior_price_sum, 210.0);
    assert_eq!(out[2].pnl, -600.0);
    let cum: Vec<f64> = out.iter().map(|r| r.cumulative_pnl).collect();
    assert_eq!(cum, vec![0.0, 50.0, -550.0]);
}

#[test]
fn duplicate_timestamps_produce_duplicate_keys() {
    let rows = vec![
        vec![Cell::Integer(1), "BUY".into(), Cell::Real(5.0), Cell::Real(1.0)],
        vec![Cell::Integer(2), "SELL".into(), Cell::Real(6.0), Cell::Real(1.0)],
        vec![Cell::Integer(2), "SELL".into(), Cell::Real(7.0), Cell::Real(1.0)],
    ];
    let out = compute(COLS, &rows).unwrap();
    assert_eq!(out.len(), 3);
    assert_eq!(out[1].timestamp, out[2].timestamp);
    assert_eq!(out[1].cumulative_pnl, 1.0);
    assert_eq!(out[2].cumulative_pnl, 3.0);
}

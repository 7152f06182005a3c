//! fills-pnl
//!
//! Cumulative realized-PnL series over a set of fills.
//! - Rows are projected by column name, then stably sorted by timestamp
//! - A SELL realizes `(price - sum of strictly earlier prices) * qty`
//! - BUY rows realize nothing but feed the prefix sum
//! - One output point per input row; equal timestamps are never merged
//!
//! Pure deterministic logic (no IO, no time). CSV/JSON writers live in
//! [`export`].

mod calculator;
mod series;

pub mod export;

pub use calculator::{compute, compute_naive, compute_rows, PnlError, PnlRow};
pub use series::{PnlSeries, TimestampMap};

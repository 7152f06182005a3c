//! Shared row, fill and filter types.
//!
//! Everything here is plain data: the store produces `ResultSet`s of `Cell`s,
//! the PnL engine consumes them, and the daemon/CLI serialize `PnlPoint`s.

mod filter;

pub use filter::{FilterSpec, FilterSpecError};

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Name of the one logical table this service reads.
pub const FILLS_TABLE: &str = "fills";

/// Columns of the `fills` table, in schema order.
pub const FILL_COLUMNS: &[&str] = &[
    "timestamp",
    "symbol",
    "exchange",
    "side",
    "fill_price",
    "fill_quantity",
];

/// Categorical columns offered as filter options.
pub const CATALOG_COLUMNS: &[&str] = &["exchange", "symbol"];

// ---------------------------------------------------------------------------
// Cell / ResultSet
// ---------------------------------------------------------------------------

/// One dynamically typed value read back from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl Cell {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    /// Numeric view. Text is parsed leniently so that prices stored as
    /// decimal strings still work.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Integer(i) => Some(*i as f64),
            Cell::Real(r) => Some(*r),
            Cell::Text(s) => s.trim().parse::<f64>().ok(),
            Cell::Null => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            Cell::Null => 0,
            Cell::Integer(_) | Cell::Real(_) => 1,
            Cell::Text(_) => 2,
        }
    }

    /// Total order matching SQLite's cross-type ordering:
    /// `NULL < numbers < text`, numbers compared by value, text byte-wise.
    pub fn total_cmp(&self, other: &Cell) -> Ordering {
        match (self, other) {
            (Cell::Integer(a), Cell::Integer(b)) => a.cmp(b),
            (Cell::Real(a), Cell::Real(b)) => cmp_real(*a, *b),
            (Cell::Integer(a), Cell::Real(b)) => cmp_int_real(*a, *b),
            (Cell::Real(a), Cell::Integer(b)) => cmp_int_real(*b, *a).reverse(),
            (Cell::Text(a), Cell::Text(b)) => a.as_bytes().cmp(b.as_bytes()),
            _ => self.type_rank().cmp(&other.type_rank()),
        }
    }
}

/// `-0.0 == 0.0`, so reals agree with the integer they equal. NaN falls back
/// to `total_cmp` (above or below every number by sign).
fn cmp_real(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or_else(|| a.total_cmp(&b))
}

/// Exact integer/real comparison; casting the integer to `f64` would lose
/// precision above 2^53 and break transitivity.
fn cmp_int_real(i: i64, r: f64) -> Ordering {
    // 2^63 is exactly representable; every finite r in [-2^63, 2^63) truncates
    // to a value that fits in i64.
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if r.is_nan() {
        return (i as f64).total_cmp(&r);
    }
    if r >= LIMIT {
        return Ordering::Less;
    }
    if r < -LIMIT {
        return Ordering::Greater;
    }
    let whole = r.trunc();
    match i.cmp(&(whole as i64)) {
        Ordering::Equal if r > whole => Ordering::Less,
        Ordering::Equal if r < whole => Ordering::Greater,
        ord => ord,
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => write!(f, "null"),
            Cell::Integer(i) => write!(f, "{i}"),
            Cell::Real(r) => write!(f, "{r}"),
            Cell::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for Cell {
    fn from(v: i64) -> Self {
        Cell::Integer(v)
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Cell::Real(v)
    }
}

impl From<&str> for Cell {
    fn from(v: &str) -> Self {
        Cell::Text(v.to_string())
    }
}

impl From<String> for Cell {
    fn from(v: String) -> Self {
        Cell::Text(v)
    }
}

/// Rows plus the column names of the statement that produced them.
///
/// `columns` is populated from the prepared statement, so it is present even
/// when `rows` is empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl ResultSet {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Fills
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "BUY" => Some(Side::Buy),
            "SELL" => Some(Side::Sell),
            _ => None,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One executed trade leg, as stored in the `fills` table.
///
/// `timestamp` is epoch microseconds; it is not unique across records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillRecord {
    pub timestamp: i64,
    pub symbol: String,
    pub exchange: String,
    pub side: Side,
    pub fill_price: f64,
    pub fill_quantity: f64,
}

impl FillRecord {
    pub fn new(
        timestamp: i64,
        symbol: impl Into<String>,
        exchange: impl Into<String>,
        side: Side,
        fill_price: f64,
        fill_quantity: f64,
    ) -> Self {
        Self {
            timestamp,
            symbol: symbol.into(),
            exchange: exchange.into(),
            side,
            fill_price,
            fill_quantity,
        }
    }

    /// Row in [`FILL_COLUMNS`] order.
    pub fn to_row(&self) -> Vec<Cell> {
        vec![
            Cell::Integer(self.timestamp),
            Cell::Text(self.symbol.clone()),
            Cell::Text(self.exchange.clone()),
            Cell::Text(self.side.as_str().to_string()),
            Cell::Real(self.fill_price),
            Cell::Real(self.fill_quantity),
        ]
    }
}

// ---------------------------------------------------------------------------
// PnL output
// ---------------------------------------------------------------------------

/// One point of a cumulative PnL series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PnlPoint {
    pub timestamp: Cell,
    pub cumulative_pnl: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_order_follows_sqlite_type_ranks() {
        let mut cells = vec![
            Cell::from("a"),
            Cell::Real(2.5),
            Cell::Null,
            Cell::Integer(3),
            Cell::Integer(1),
        ];
        cells.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(
            cells,
            vec![
                Cell::Null,
                Cell::Integer(1),
                Cell::Real(2.5),
                Cell::Integer(3),
                Cell::from("a"),
            ]
        );
    }

    #[test]
    fn integer_and_real_compare_numerically() {
        assert_eq!(Cell::Integer(2).total_cmp(&Cell::Real(2.0)), Ordering::Equal);
        assert_eq!(Cell::Real(1.5).total_cmp(&Cell::Integer(2)), Ordering::Less);
        assert_eq!(Cell::Real(-1.5).total_cmp(&Cell::Integer(-1)), Ordering::Less);
        assert_eq!(Cell::Real(-0.0).total_cmp(&Cell::Real(0.0)), Ordering::Equal);
        assert_eq!(Cell::Integer(0).total_cmp(&Cell::Real(-0.0)), Ordering::Equal);
    }

    #[test]
    fn large_integers_compare_exactly_against_reals() {
        let two_53 = 1_i64 << 53;
        let lo = Cell::Integer(two_53);
        let hi = Cell::Integer(two_53 + 1);
        let r = Cell::Real(two_53 as f64);

        assert_eq!(lo.total_cmp(&hi), Ordering::Less);
        assert_eq!(lo.total_cmp(&r), Ordering::Equal);
        assert_eq!(hi.total_cmp(&r), Ordering::Greater);
        assert_eq!(r.total_cmp(&hi), Ordering::Less);

        assert_eq!(Cell::Integer(i64::MAX).total_cmp(&Cell::Real(9.3e18)), Ordering::Less);
        assert_eq!(Cell::Integer(i64::MIN).total_cmp(&Cell::Real(-9.3e18)), Ordering::Greater);
        assert_eq!(
            Cell::Integer(i64::MIN).total_cmp(&Cell::Real(i64::MIN as f64)),
            Ordering::Equal
        );
    }

    #[test]
    fn mixed_numeric_order_is_transitive() {
        let two_53 = 1_i64 << 53;
        let cells = vec![
            Cell::Integer(two_53 - 1),
            Cell::Integer(two_53),
            Cell::Integer(two_53 + 1),
            Cell::Integer(two_53 + 2),
            Cell::Real(two_53 as f64),
            Cell::Real((two_53 + 2) as f64),
            Cell::Real(0.0),
            Cell::Real(-0.0),
            Cell::Integer(0),
            Cell::Real(f64::INFINITY),
            Cell::Real(f64::NEG_INFINITY),
            Cell::Integer(i64::MAX),
            Cell::Integer(i64::MIN),
            Cell::Real(0.5),
            Cell::Integer(1),
        ];
        for a in &cells {
            for b in &cells {
                assert_eq!(a.total_cmp(b), b.total_cmp(a).reverse(), "{a} vs {b}");
                for c in &cells {
                    if a.total_cmp(b) != Ordering::Greater && b.total_cmp(c) != Ordering::Greater {
                        assert_ne!(a.total_cmp(c), Ordering::Greater, "{a} <= {b} <= {c}");
                    }
                }
            }
        }

        let mut sorted = cells.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));
        assert!(sorted.windows(2).all(|w| w[0].total_cmp(&w[1]) != Ordering::Greater));
    }

    #[test]
    fn side_parse_is_exact() {
        assert_eq!(Side::parse("SELL"), Some(Side::Sell));
        assert_eq!(Side::parse("BUY"), Some(Side::Buy));
        assert_eq!(Side::parse("sell"), None);
    }

    #[test]
    fn fill_record_row_matches_column_order() {
        let f = FillRecord::new(7, "BTC", "BINANCE", Side::Sell, 10.0, 2.0);
        let row = f.to_row();
        assert_eq!(row.len(), FILL_COLUMNS.len());
        assert_eq!(row[0], Cell::Integer(7));
        assert_eq!(row[3], Cell::from("SELL"));
    }
}

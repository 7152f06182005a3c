use std::cmp::Ordering;
use std::fmt;

use fills_schemas::{Cell, PnlPoint, Side};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Rows could not be projected onto the fields the calculation needs.
#[derive(Debug, Clone, PartialEq)]
pub enum PnlError {
    /// A required column is absent from the result set.
    MissingColumn { column: &'static str },
    /// A row holds a value that cannot be read as the expected type.
    InvalidField {
        row: usize,
        column: &'static str,
        value: Cell,
    },
}

impl fmt::Display for PnlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingColumn { column } => {
                write!(f, "pnl input is missing column '{column}'")
            }
            Self::InvalidField { row, column, value } => {
                write!(f, "pnl input row {row}: invalid {column} value '{value}'")
            }
        }
    }
}

impl std::error::Error for PnlError {}

// ---------------------------------------------------------------------------
// Projection
// ---------------------------------------------------------------------------

const TIMESTAMP: &str = "timestamp";
const SIDE: &str = "side";
const FILL_PRICE: &str = "fill_price";
const FILL_QUANTITY: &str = "fill_quantity";

#[derive(Debug, Clone)]
struct ProjectedFill {
    timestamp: Cell,
    side: Side,
    price: f64,
    qty: f64,
}

struct Projection {
    timestamp: usize,
    side: usize,
    price: usize,
    qty: usize,
}

impl Projection {
    fn resolve<S: AsRef<str>>(columns: &[S]) -> Result<Self, PnlError> {
        let find = |column: &'static str| {
            columns
                .iter()
                .position(|c| c.as_ref() == column)
                .ok_or(PnlError::MissingColumn { column })
        };
        Ok(Self {
            timestamp: find(TIMESTAMP)?,
            side: find(SIDE)?,
            price: find(FILL_PRICE)?,
            qty: find(FILL_QUANTITY)?,
        })
    }

    fn project(&self, row_no: usize, row: &[Cell]) -> Result<ProjectedFill, PnlError> {
        let cell = |idx: usize, column: &'static str| {
            row.get(idx).ok_or(PnlError::InvalidField {
                row: row_no,
                column,
                value: Cell::Null,
            })
        };
        let invalid = |column: &'static str, value: &Cell| PnlError::InvalidField {
            row: row_no,
            column,
            value: value.clone(),
        };

        let timestamp = cell(self.timestamp, TIMESTAMP)?.clone();

        let side_cell = cell(self.side, SIDE)?;
        let side = side_cell
            .as_str()
            .and_then(Side::parse)
            .ok_or_else(|| invalid(SIDE, side_cell))?;

        let price_cell = cell(self.price, FILL_PRICE)?;
        let price = price_cell
            .as_f64()
            .ok_or_else(|| invalid(FILL_PRICE, price_cell))?;

        let qty_cell = cell(self.qty, FILL_QUANTITY)?;
        let qty = qty_cell
            .as_f64()
            .ok_or_else(|| invalid(FILL_QUANTITY, qty_cell))?;

        Ok(ProjectedFill {
            timestamp,
            side,
            price,
            qty,
        })
    }
}

/// Project and stably sort by timestamp. Ties keep supplied row order.
fn project_sorted<S: AsRef<str>>(
    columns: &[S],
    rows: &[Vec<Cell>],
) -> Result<Vec<ProjectedFill>, PnlError> {
    let projection = Projection::resolve(columns)?;
    let mut fills = rows
        .iter()
        .enumerate()
        .map(|(i, r)| projection.project(i, r))
        .collect::<Result<Vec<_>, _>>()?;
    fills.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
    Ok(fills)
}

fn realized(f: &ProjectedFill, prior_price_sum: f64) -> f64 {
    match f.side {
        Side::Sell => (f.price - prior_price_sum) * f.qty,
        Side::Buy => 0.0,
    }
}

// ---------------------------------------------------------------------------
// Output rows
// ---------------------------------------------------------------------------

/// Per-row breakdown of the series, in output order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PnlRow {
    pub timestamp: Cell,
    pub side: Side,
    pub fill_price: f64,
    pub fill_quantity: f64,
    /// Sum of `fill_price` over rows with a strictly smaller timestamp.
    pub prior_price_sum: f64,
    pub pnl: f64,
    pub cumulative_pnl: f64,
}

impl PnlRow {
    pub fn point(&self) -> PnlPoint {
        PnlPoint {
            timestamp: self.timestamp.clone(),
            cumulative_pnl: self.cumulative_pnl,
        }
    }
}

// ---------------------------------------------------------------------------
// Calculation
// ---------------------------------------------------------------------------

/// Compute the cumulative PnL series as one point per input row.
///
/// Zero rows yield an empty series regardless of `columns`.
pub fn compute<S: AsRef<str>>(columns: &[S], rows: &[Vec<Cell>]) -> Result<Vec<PnlPoint>, PnlError> {
    Ok(compute_rows(columns, rows)?.iter().map(PnlRow::point).collect())
}

/// Single ascending pass over timestamp groups.
///
/// Every row of a group sees the prefix sum frozen before the group started;
/// the group's prices are folded into the prefix only after the whole group
/// is emitted.
pub fn compute_rows<S: AsRef<str>>(
    columns: &[S],
    rows: &[Vec<Cell>],
) -> Result<Vec<PnlRow>, PnlError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let fills = project_sorted(columns, rows)?;
    let mut out = Vec::with_capacity(fills.len());

    let mut prefix = 0.0_f64;
    let mut cumulative = 0.0_f64;
    let mut start = 0usize;

    while start < fills.len() {
        let group_ts = &fills[start].timestamp;
        let end = fills[start..]
            .iter()
            .position(|f| f.timestamp.total_cmp(group_ts) != Ordering::Equal)
            .map_or(fills.len(), |off| start + off);

        let group = &fills[start..end];
        let prior = prefix;
        for f in group {
            let pnl = realized(f, prior);
            cumulative += pnl;
            out.push(PnlRow {
                timestamp: f.timestamp.clone(),
                side: f.side,
                fill_price: f.price,
                fill_quantity: f.qty,
                prior_price_sum: prior,
                pnl,
                cumulative_pnl: cumulative,
            });
        }

        // fold prices row by row so the summation order matches a plain scan
        for f in group {
            prefix += f.price;
        }
        start = end;
    }

    Ok(out)
}

/// Direct O(n²) definition: each row re-scans every row for strictly earlier
/// timestamps. Reference for tests; [`compute_rows`] must match it exactly.
pub fn compute_naive<S: AsRef<str>>(
    columns: &[S],
    rows: &[Vec<Cell>],
) -> Result<Vec<PnlRow>, PnlError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let fills = project_sorted(columns, rows)?;
    let mut out = Vec::with_capacity(fills.len());
    let mut cumulative = 0.0_f64;

    for f in &fills {
        let prior = fills
            .iter()
            .filter(|g| g.timestamp.total_cmp(&f.timestamp) == Ordering::Less)
            .fold(0.0_f64, |acc, g| acc + g.price);
        let pnl = realized(f, prior);
        cumulative += pnl;
        out.push(PnlRow {
            timestamp: f.timestamp.clone(),
            side: f.side,
            fill_price: f.price,
            fill_quantity: f.qty,
            prior_price_sum: prior,
            pnl,
            cumulative_pnl: cumulative,
        });
    }

    Ok(out)
}

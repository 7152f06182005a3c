use std::cmp::Ordering;

use fills_schemas::{Cell, PnlPoint};
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::calculator::{compute_rows, PnlError, PnlRow};

/// A computed series plus the per-row breakdown it was derived from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PnlSeries {
    rows: Vec<PnlRow>,
}

impl PnlSeries {
    pub fn compute<S: AsRef<str>>(columns: &[S], rows: &[Vec<Cell>]) -> Result<Self, PnlError> {
        Ok(Self {
            rows: compute_rows(columns, rows)?,
        })
    }

    pub fn rows(&self) -> &[PnlRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All points in output order; duplicate timestamps are kept.
    pub fn points(&self) -> Vec<PnlPoint> {
        self.rows.iter().map(PnlRow::point).collect()
    }

    /// Cumulative PnL after the last row, or `None` for an empty series.
    pub fn final_pnl(&self) -> Option<f64> {
        self.rows.last().map(|r| r.cumulative_pnl)
    }

    /// One point per distinct timestamp: the cumulative value after the last
    /// row of each timestamp group.
    pub fn last_per_timestamp(&self) -> Vec<PnlPoint> {
        let mut out: Vec<PnlPoint> = Vec::new();
        for r in &self.rows {
            match out.last_mut() {
                Some(prev) if prev.timestamp.total_cmp(&r.timestamp) == Ordering::Equal => {
                    prev.cumulative_pnl = r.cumulative_pnl;
                }
                _ => out.push(r.point()),
            }
        }
        out
    }
}

/// Serializes points as a JSON object `{"<timestamp>": cumulative_pnl, ...}`
/// in the order given. Callers pass [`PnlSeries::last_per_timestamp`] so
/// keys are unique.
pub struct TimestampMap<'a>(pub &'a [PnlPoint]);

impl Serialize for TimestampMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for p in self.0 {
            map.serialize_entry(&p.timestamp.to_string(), &p.cumulative_pnl)?;
        }
        map.end()
    }
}
